use cnpj_enrich::domain::Cnpj;

#[test]
fn normalize_formatted_cnpj() {
    assert_eq!(Cnpj::normalize("12.345.678/0001-99"), "12345678000199");
}

#[test]
fn normalize_removes_only_non_digits() {
    let cases = [
        ("", ""),
        ("abc", ""),
        ("  00.000.000/0000-00 ", "00000000000000"),
        ("1-2-3", "123"),
        ("CNPJ: 98.765.432/0001-10", "98765432000110"),
    ];
    for (input, expected) in cases {
        assert_eq!(Cnpj::normalize(input), expected, "{input}");
    }
}

#[test]
fn malformed_cnpj_is_still_usable() {
    let cnpj = Cnpj::from_raw("12.345");
    assert!(!cnpj.is_well_formed());
    assert_eq!(cnpj.as_str(), "12345");
}
