use std::fmt;

pub const CNPJ_DIGITS: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cnpj {
    raw: String,
    digits: String,
}

impl Cnpj {
    pub fn from_raw(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            digits: Self::normalize(raw),
        }
    }

    pub fn normalize(value: &str) -> String {
        value.chars().filter(|ch| ch.is_ascii_digit()).collect()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn is_well_formed(&self) -> bool {
        self.digits.len() == CNPJ_DIGITS
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(Cnpj::normalize("12.345.678/0001-99"), "12345678000199");
    }

    #[test]
    fn normalize_keeps_digit_order() {
        assert_eq!(Cnpj::normalize(" 9a8b7-6 "), "9876");
        assert_eq!(Cnpj::normalize("no digits"), "");
    }

    #[test]
    fn well_formed_requires_fourteen_digits() {
        assert!(Cnpj::from_raw("12.345.678/0001-99").is_well_formed());
        assert!(!Cnpj::from_raw("123").is_well_formed());
    }

    #[test]
    fn keeps_raw_form() {
        let cnpj = Cnpj::from_raw("12.345.678/0001-99");
        assert_eq!(cnpj.raw(), "12.345.678/0001-99");
        assert_eq!(cnpj.to_string(), "12345678000199");
    }
}
