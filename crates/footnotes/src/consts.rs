use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Leading `---` metadata block, as written by most static site generators.
regex!(FRONT_MATTER_REGEX, r"(?s)\A---\r?\n.*?\r?\n---\r?\n");

// Start of a footnote definition, capturing its label.
regex!(FOOTNOTE_DEFINITION_REGEX, r"(?m)^ {0,3}\[\^([^\]\s]+)\]:");
