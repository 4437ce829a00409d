//! Enumeration scenarios: products, filters, conditions, assignments.

mod common;

use common::{check, dicts, exp};

#[test]
fn test_simple_variant() {
    check(
        "c = abc
variants:
    - a:
        x = va
    - b:
        x = vb
",
        false,
        vec![
            exp("a", "a").var("c", "abc").var("x", "va"),
            exp("b", "b").var("c", "abc").var("x", "vb"),
        ],
    );
}

#[test]
fn test_two_axes_product() {
    check(
        "c = abc
variants:
    - a:
        x = va
    - b:
        x = vb
variants:
    - 1:
        y = w1
    - 2:
        y = w2
",
        false,
        vec![
            exp("1.a", "1.a").maps("1.a", "1.a").var("c", "abc").var("x", "va").var("y", "w1"),
            exp("1.b", "1.b").var("c", "abc").var("x", "vb").var("y", "w1"),
            exp("2.a", "2.a").var("c", "abc").var("x", "va").var("y", "w2"),
            exp("2.b", "2.b").var("c", "abc").var("x", "vb").var("y", "w2"),
        ],
    );
}

#[test]
fn test_filter_mixing() {
    check(
        "variants:
    - unknown_qemu:
    - rhel64:
only unknown_qemu
variants:
    - kvm:
    - nokvm:
variants:
    - testA:
        nokvm:
            no unknown_qemu
    - testB:
",
        false,
        vec![
            exp("testA.kvm.unknown_qemu", "testA.kvm.unknown_qemu"),
            exp("testB.kvm.unknown_qemu", "testB.kvm.unknown_qemu"),
            exp("testB.nokvm.unknown_qemu", "testB.nokvm.unknown_qemu"),
        ],
    );
}

#[test]
fn test_name_variant() {
    check(
        "variants tests: # All tests in configuration
    - wait:
        run = \"wait\"
        variants:
            - long:
                time = short_time
            - short: long
                time = long_time
    - test2:
        run = \"test1\"

variants virt_system:
    - @linux:
    - windows:

variants host_os:
    - linux:
        image = linux
    - windows:
        image = windows

only (host_os=linux)
",
        false,
        vec![
            exp(
                "(host_os=linux).(virt_system=linux).(tests=wait).long",
                "linux.wait.long",
            )
            .maps(
                "(host_os=linux).(virt_system=linux).(tests=wait).long",
                "linux.linux.wait.long",
            )
            .var("host_os", "linux")
            .var("image", "linux")
            .var("run", "wait")
            .var("tests", "wait")
            .var("time", "short_time")
            .var("virt_system", "linux"),
            exp(
                "(host_os=linux).(virt_system=linux).(tests=wait).short",
                "linux.wait.short",
            )
            .maps(
                "(host_os=linux).(virt_system=linux).(tests=wait).short",
                "linux.linux.wait.short",
            )
            .dep(&["(host_os=linux).(virt_system=linux).(tests=wait).long"])
            .var("host_os", "linux")
            .var("image", "linux")
            .var("run", "wait")
            .var("tests", "wait")
            .var("time", "long_time")
            .var("virt_system", "linux"),
            exp(
                "(host_os=linux).(virt_system=linux).(tests=test2)",
                "linux.test2",
            )
            .maps(
                "(host_os=linux).(virt_system=linux).(tests=test2)",
                "linux.linux.test2",
            )
            .var("host_os", "linux")
            .var("image", "linux")
            .var("run", "test1")
            .var("tests", "test2")
            .var("virt_system", "linux"),
            exp(
                "(host_os=linux).(virt_system=windows).(tests=wait).long",
                "linux.windows.wait.long",
            )
            .maps(
                "(host_os=linux).(virt_system=windows).(tests=wait).long",
                "linux.windows.wait.long",
            )
            .var("host_os", "linux")
            .var("image", "linux")
            .var("run", "wait")
            .var("tests", "wait")
            .var("time", "short_time")
            .var("virt_system", "windows"),
            exp(
                "(host_os=linux).(virt_system=windows).(tests=wait).short",
                "linux.windows.wait.short",
            )
            .maps(
                "(host_os=linux).(virt_system=windows).(tests=wait).short",
                "linux.windows.wait.short",
            )
            .dep(&["(host_os=linux).(virt_system=windows).(tests=wait).long"])
            .var("host_os", "linux")
            .var("image", "linux")
            .var("run", "wait")
            .var("tests", "wait")
            .var("time", "long_time")
            .var("virt_system", "windows"),
            exp(
                "(host_os=linux).(virt_system=windows).(tests=test2)",
                "linux.windows.test2",
            )
            .maps(
                "(host_os=linux).(virt_system=windows).(tests=test2)",
                "linux.windows.test2",
            )
            .var("host_os", "linux")
            .var("image", "linux")
            .var("run", "test1")
            .var("tests", "test2")
            .var("virt_system", "windows"),
        ],
    );
}

#[test]
fn test_condition_in_variant() {
    check(
        "variants tests [meta1]:
    - wait:
        run = \"wait\"
        variants:
            - long:
                time = short_time
            - short: long
                time = long_time
    - test2:
        run = \"test1\"

test2: bbb = aaaa
    aaa = 1
",
        true,
        vec![
            exp("(tests=wait).long", "wait.long")
                .maps("(tests=wait).long", "wait.long")
                .var("run", "wait")
                .var("tests", "wait")
                .var("time", "short_time"),
            exp("(tests=wait).short", "wait.short")
                .maps("(tests=wait).short", "wait.short")
                .dep(&["(tests=wait).long"])
                .var("run", "wait")
                .var("tests", "wait")
                .var("time", "long_time"),
            exp("(tests=test2)", "test2")
                .maps("(tests=test2)", "test2")
                .var("aaa", "1")
                .var("bbb", "aaaa")
                .var("run", "test1")
                .var("tests", "test2"),
        ],
    );
}

#[test]
fn test_conditions_across_axes() {
    check(
        "variants:
    - a:
        foo = foo
        c:
            foo = bar
    - b:
        foo = foob
variants:
    - c:
        bala = lalalala
        a:
            bala = balabala
    - d:
",
        true,
        vec![
            exp("c.a", "c.a")
                .var("foo", "bar")
                .var("bala", "balabala"),
            exp("c.b", "c.b")
                .var("foo", "foob")
                .var("bala", "lalalala"),
            exp("d.a", "d.a").var("foo", "foo"),
            exp("d.b", "d.b").var("foo", "foob"),
        ],
    );
}

#[test]
fn test_negative_condition() {
    check(
        "variants tests [meta1]:
    - wait:
        run = \"wait\"
        variants:
            - long:
                time = short_time
            - short: long
                time = long_time
    - test2:
        run = \"test1\"

!test2: bbb = aaaa
    aaa = 1
",
        true,
        vec![
            exp("(tests=wait).long", "wait.long")
                .maps("(tests=wait).long", "wait.long")
                .var("aaa", "1")
                .var("bbb", "aaaa")
                .var("run", "wait")
                .var("tests", "wait")
                .var("time", "short_time"),
            exp("(tests=wait).short", "wait.short")
                .maps("(tests=wait).short", "wait.short")
                .dep(&["(tests=wait).long"])
                .var("aaa", "1")
                .var("bbb", "aaaa")
                .var("run", "wait")
                .var("tests", "wait")
                .var("time", "long_time"),
            exp("(tests=test2)", "test2")
                .maps("(tests=test2)", "test2")
                .var("run", "test1")
                .var("tests", "test2"),
        ],
    );
}

#[test]
fn test_complicated_filter() {
    check(
        "variants tests:
    - wait:
        run = \"wait\"
        variants:
            - long:
                time = short_time
            - short: long
                time = long_time
                only (host_os=linux), ( guest_os =    linux  )
    - test2:
        run = \"test1\"

variants guest_os:
    - linux:
        install = linux
        no (tests=wait)..short
    - windows:
        install = windows
        only test2

variants host_os:
    - linux:
        start = linux
    - windows:
        start = windows
        only test2
",
        true,
        vec![
            exp(
                "(host_os=linux).(guest_os=linux).(tests=wait).long",
                "linux.linux.wait.long",
            )
            .maps(
                "(host_os=linux).(guest_os=linux).(tests=wait).long",
                "linux.linux.wait.long",
            )
            .var("guest_os", "linux")
            .var("host_os", "linux")
            .var("install", "linux")
            .var("run", "wait")
            .var("start", "linux")
            .var("tests", "wait")
            .var("time", "short_time"),
            exp(
                "(host_os=linux).(guest_os=linux).(tests=test2)",
                "linux.linux.test2",
            )
            .maps(
                "(host_os=linux).(guest_os=linux).(tests=test2)",
                "linux.linux.test2",
            )
            .var("guest_os", "linux")
            .var("host_os", "linux")
            .var("install", "linux")
            .var("run", "test1")
            .var("start", "linux")
            .var("tests", "test2"),
            exp(
                "(host_os=linux).(guest_os=windows).(tests=test2)",
                "linux.windows.test2",
            )
            .maps(
                "(host_os=linux).(guest_os=windows).(tests=test2)",
                "linux.windows.test2",
            )
            .var("guest_os", "windows")
            .var("host_os", "linux")
            .var("install", "windows")
            .var("run", "test1")
            .var("start", "linux")
            .var("tests", "test2"),
            exp(
                "(host_os=windows).(guest_os=linux).(tests=test2)",
                "windows.linux.test2",
            )
            .maps(
                "(host_os=windows).(guest_os=linux).(tests=test2)",
                "windows.linux.test2",
            )
            .var("guest_os", "linux")
            .var("host_os", "windows")
            .var("install", "linux")
            .var("run", "test1")
            .var("start", "windows")
            .var("tests", "test2"),
            exp(
                "(host_os=windows).(guest_os=windows).(tests=test2)",
                "windows.windows.test2",
            )
            .maps(
                "(host_os=windows).(guest_os=windows).(tests=test2)",
                "windows.windows.test2",
            )
            .var("guest_os", "windows")
            .var("host_os", "windows")
            .var("install", "windows")
            .var("run", "test1")
            .var("start", "windows")
            .var("tests", "test2"),
        ],
    );
}

#[test]
fn test_variable_assignment() {
    check(
        "variants tests:
    - system1:
        var = 1
        var = 2
        var += a
        var <= b
        system = 2
        variable-name-with-dashes = sampletext
        ddd = tests variant is ${tests}
        dashes = show ${variable-name-with-dashes}
        error = ${tests + str(int(system) + 3)}4
        s.* ?= ${tests}ahoj4
        s.* ?+= c
        s.* ?<= d
        system += 4
        var += \"test\"
        1st = 1
        starts_with_number = index ${1st}
        not_a_substitution = ${}
",
        true,
        vec![exp("(tests=system1)", "system1")
            .maps("(tests=system1)", "system1")
            .var("tests", "system1")
            .var("var", "b2atest")
            .var("system", "dsystem1ahoj4c4")
            .var("variable-name-with-dashes", "sampletext")
            .var("ddd", "tests variant is system1")
            .var("dashes", "show sampletext")
            .var("error", "${tests + str(int(system) + 3)}4")
            .var("1st", "1")
            .var("starts_with_number", "index 1")
            .var("not_a_substitution", "${}")],
    );
}

#[test]
fn test_variable_lazy_assignment() {
    check(
        "arg1 = ~balabala
variants:
    - base_content:
        foo = bar
    - empty_content:
variants:
    - lazy_set:
        foo ~= baz
    - lazy_set_with_substitution:
        foo ~= ${arg1}
    - lazy_set_with_double_token:
        foo ~= ~= foo
    - dummy_set:
foo ~= qux
",
        true,
        vec![
            exp("lazy_set.base_content", "lazy_set.base_content")
                .var("arg1", "~balabala")
                .var("foo", "bar"),
            exp("lazy_set.empty_content", "lazy_set.empty_content")
                .var("arg1", "~balabala")
                .var("foo", "baz"),
            exp(
                "lazy_set_with_substitution.base_content",
                "lazy_set_with_substitution.base_content",
            )
            .var("arg1", "~balabala")
            .var("foo", "bar"),
            exp(
                "lazy_set_with_substitution.empty_content",
                "lazy_set_with_substitution.empty_content",
            )
            .var("arg1", "~balabala")
            .var("foo", "~balabala"),
            exp(
                "lazy_set_with_double_token.base_content",
                "lazy_set_with_double_token.base_content",
            )
            .var("arg1", "~balabala")
            .var("foo", "bar"),
            exp(
                "lazy_set_with_double_token.empty_content",
                "lazy_set_with_double_token.empty_content",
            )
            .var("arg1", "~balabala")
            .var("foo", "~= foo"),
            exp("dummy_set.base_content", "dummy_set.base_content")
                .var("arg1", "~balabala")
                .var("foo", "bar"),
            exp("dummy_set.empty_content", "dummy_set.empty_content")
                .var("arg1", "~balabala")
                .var("foo", "qux"),
        ],
    );
}

#[test]
fn test_empty_input_yields_one_bare_dict() {
    let ds = dicts("", false);
    assert_eq!(ds.len(), 1);
    let d = &ds[0];
    assert_eq!(d.get("name").map(ToString::to_string), Some(String::new()));
    assert_eq!(
        d.get("shortname").map(ToString::to_string),
        Some(String::new())
    );
    assert_eq!(d.get("dep").map(ToString::to_string), Some("[]".to_owned()));
    assert!(d.contains_key("_name_map_file"));
    assert!(d.contains_key("_short_name_map_file"));
    assert_eq!(d.len(), 5);
}

#[test]
fn test_only_without_match_yields_nothing() {
    let ds = dicts(
        "variants:
    - a:
    - b:
only zzz
",
        false,
    );
    assert!(ds.is_empty());
}

#[test]
fn test_enumeration_is_replayable() {
    use cartc_gen::GenerateDicts;
    use cartc_par::{Parser, ParserConfig};

    let mut parser = Parser::new(ParserConfig::default());
    parser
        .parse_string(
            "variants:
    - a:
        x = 1
    - b:
        x = 2
only a
",
        )
        .expect("config must parse");
    let first: Vec<_> = parser.get_dicts(true).collect();
    let second: Vec<_> = parser.get_dicts(true).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[test]
fn test_only_filter_is_monotone() {
    let base = "variants:
    - a:
    - b:
variants:
    - 1:
    - 2:
";
    let unfiltered = dicts(base, false);
    let filtered = dicts(&format!("{base}only a\n"), false);
    assert_eq!(unfiltered.len(), 4);
    assert_eq!(filtered.len(), 2);
    for d in &filtered {
        assert!(unfiltered.contains(d));
    }
}

#[test]
fn test_assignments_only_config_yields_single_dict() {
    let ds = dicts("a = 1\nb = 2\na = 3\n", false);
    assert_eq!(ds.len(), 1);
    let d = &ds[0];
    assert_eq!(d.get("a").map(ToString::to_string), Some("3".to_owned()));
    assert_eq!(d.get("b").map(ToString::to_string), Some("2".to_owned()));
}

#[test]
fn test_programmatic_only_filter() {
    use cartc_gen::GenerateDicts;
    use cartc_par::{Parser, ParserConfig};

    let mut parser = Parser::new(ParserConfig::default());
    parser
        .parse_string(
            "variants:
    - unknown_qemu:
    - rhel64:
",
        )
        .expect("config must parse");
    parser.only_filter("unknown_qemu").expect("filter parses");
    let names: Vec<String> = parser
        .get_dicts(true)
        .filter_map(|d| d.get("name").map(ToString::to_string))
        .collect();
    assert_eq!(names, ["unknown_qemu"]);
}
