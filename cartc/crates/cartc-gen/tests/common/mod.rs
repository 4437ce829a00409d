//! Shared helpers for the enumeration tests: parse a config string and
//! compare the emitted dictionaries against expected ones.

use cartc_gen::GenerateDicts;
use cartc_par::{Parser, ParserConfig};
use cartc_util::{DictValue, FlatDict};

use indexmap::IndexMap;

pub fn dicts(source: &str, defaults: bool) -> Vec<FlatDict> {
    let mut parser = Parser::new(ParserConfig {
        defaults,
        ..ParserConfig::default()
    });
    parser.parse_string(source).expect("config must parse");
    parser.get_dicts(true).collect()
}

pub fn parse_error(source: &str, defaults: bool) -> cartc_util::ParseError {
    let mut parser = Parser::new(ParserConfig {
        defaults,
        ..ParserConfig::default()
    });
    parser
        .parse_string(source)
        .expect_err("config must not parse")
}

/// Expected-dictionary builder. The two file maps default to the full and
/// bare-value paths keyed under the string-source sentinel.
pub struct Exp {
    name: String,
    shortname: String,
    map_name: String,
    map_short: String,
    dep: Vec<String>,
    vars: Vec<(String, String)>,
}

pub fn exp(name: &str, shortname: &str) -> Exp {
    Exp {
        name: name.to_owned(),
        shortname: shortname.to_owned(),
        map_name: name.to_owned(),
        map_short: shortname.to_owned(),
        dep: Vec::new(),
        vars: Vec::new(),
    }
}

impl Exp {
    pub fn dep(mut self, deps: &[&str]) -> Self {
        self.dep = deps.iter().map(|d| (*d).to_owned()).collect();
        self
    }

    pub fn maps(mut self, map_name: &str, map_short: &str) -> Self {
        self.map_name = map_name.to_owned();
        self.map_short = map_short.to_owned();
        self
    }

    pub fn var(mut self, key: &str, value: &str) -> Self {
        self.vars.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn build(self) -> FlatDict {
        let mut d = FlatDict::new();
        d.insert("name".to_owned(), DictValue::Str(self.name));
        d.insert("dep".to_owned(), DictValue::List(self.dep));
        d.insert("shortname".to_owned(), DictValue::Str(self.shortname));
        let mut name_map = IndexMap::new();
        name_map.insert("<string>".to_owned(), self.map_name);
        d.insert("_name_map_file".to_owned(), DictValue::Map(name_map));
        let mut short_map = IndexMap::new();
        short_map.insert("<string>".to_owned(), self.map_short);
        d.insert(
            "_short_name_map_file".to_owned(),
            DictValue::Map(short_map),
        );
        for (key, value) in self.vars {
            d.insert(key, DictValue::Str(value));
        }
        d
    }
}

pub fn check(source: &str, defaults: bool, expected: Vec<Exp>) {
    let got = dicts(source, defaults);
    let expected: Vec<FlatDict> = expected.into_iter().map(Exp::build).collect();
    assert_eq!(
        got.len(),
        expected.len(),
        "dictionary count mismatch: got {:?}",
        got.iter().map(|d| d.get("name")).collect::<Vec<_>>()
    );
    for (i, (g, e)) in got.iter().zip(&expected).enumerate() {
        assert_eq!(g.get("name"), e.get("name"), "name of dict {i}");
        assert_eq!(g, e, "dict {i}");
    }
}
