use labtab::keyword::{keyword_hit, Keyword};

#[test]
fn case_insensitive_alias() {
    assert!(keyword_hit("PLT 245", "plt"));
    assert!(keyword_hit("PLATELETS 245", "Platelets"));
    assert!(!keyword_hit("PLT 245", ""));
}

#[test]
fn short_codes_tolerate_separators() {
    assert!(keyword_hit("P.L.T 245", "PLT"));
    assert!(keyword_hit("W B C: 7.2", "WBC"));
    assert!(keyword_hit("H.B.G 14.1", "H.B.G"));
}

#[test]
fn codes_need_word_boundaries() {
    assert!(!keyword_hit("MCHC 33.1", "MCH"));
    assert!(!keyword_hit("MCH 29.8", "MCHC"));
    assert!(!keyword_hit("FERRITIN 50", "ER"));
    assert!(keyword_hit("(MCH) 29.8", "MCH"));
}

#[test]
fn greek_letters_count_as_word_characters() {
    let line = "Αιμοπετάλια 245".to_uppercase();
    assert!(keyword_hit(&line, "Αιμοπετάλια"));
    assert!(!keyword_hit("ΑER 5", "ER"));
}

#[test]
fn multi_word_alias_is_a_substring_test() {
    assert!(keyword_hit("SERUM VITAMIN B12 450", "Vitamin B12"));
    assert!(!keyword_hit("VITAMIN D 30", "Vitamin B12"));
}

#[test]
fn compiled_keyword_exposes_upper_text() {
    let k = Keyword::new("  Λευκά ");
    assert_eq!(k.text(), "ΛΕΥΚΆ");
    assert!(k.hit(&"Λευκά αιμοσφαίρια 7,2".to_uppercase()));
}
