// src/phone.rs
//! Country-code aware phone validation and display formatting.

use crate::app_log;

pub const DEFAULT_COUNTRY_CODE: &str = "+33";
pub const CUSTOM_COUNTRY_CODE: &str = "custom";

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;

/// International dialing codes accepted without the leading `+`.
const VALID_COUNTRY_CODES: &[&str] = &[
    // Europe
    "33", "49", "44", "39", "34", "41", "32", "31", "43", "351", "45", "46", "47", "358", "48",
    "420", "36", "30", "90",
    // North America
    "1",
    // Africa
    "212", "213", "216", "218", "220", "221", "222", "223", "224", "225", "226", "227", "228",
    "229", "230", "231", "232", "233", "234", "235", "236", "237", "238", "239", "240", "241",
    "242", "243", "244", "245", "246", "247", "248", "249", "250", "251", "252", "253", "254",
    "255", "256", "257", "258", "260", "261", "262", "263", "264", "265", "266", "267", "268",
    "269", "290", "291", "297", "298", "299",
    // Asia
    "86", "81", "82", "91", "92", "93", "94", "95", "98", "60", "62", "63", "64", "65", "66",
    "84", "886", "852", "853", "855", "856", "880", "883", "888",
    // Oceania
    "61", "674", "675", "676", "677", "678", "679", "680", "681", "682", "683", "684", "685",
    "686", "687", "688", "689", "690", "691", "692",
    // South America
    "54", "55", "56", "57", "58", "51", "595", "597", "598",
    // Others
    "7", "20", "27", "355", "376", "378", "380", "381", "382", "383", "385", "386", "387", "389",
    "590", "591", "592", "593", "594", "596", "599",
];

/// Raw phone fields as submitted by the registration form.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneInput<'a> {
    pub country_code: &'a str,
    pub custom_country_code: &'a str,
    pub phone: &'a str,
}

impl<'a> PhoneInput<'a> {
    pub fn new(country_code: &'a str, custom_country_code: &'a str, phone: &'a str) -> Self {
        Self {
            country_code,
            custom_country_code,
            phone,
        }
    }

    /// Selected code, custom override applied, always `+`-prefixed.
    pub fn effective_country_code(&self) -> String {
        let selected = self.country_code.trim();
        let code = if selected.is_empty() {
            DEFAULT_COUNTRY_CODE
        } else if selected == CUSTOM_COUNTRY_CODE && !self.custom_country_code.trim().is_empty() {
            self.custom_country_code.trim()
        } else {
            selected
        };
        format!("+{}", code.trim_start_matches('+'))
    }
}

pub fn clean_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 1 to 4 digits, present in the known dialing-code list.
pub fn is_valid_country_code(code: &str) -> bool {
    let clean = code.trim().trim_start_matches('+');
    if clean.is_empty() || clean.len() > 4 || !clean.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    VALID_COUNTRY_CODES.contains(&clean)
}

/// Field-level validation. Returns every message that applies; an empty list
/// means the phone is acceptable. The selected (non-custom) code is not
/// checked against the allow-list here: an unknown code is handled leniently
/// by [`process_phone_number`].
pub fn validate_phone_field(input: &PhoneInput<'_>) -> Vec<String> {
    let mut errors = Vec::new();
    let selected = input.country_code.trim();
    let custom = input.custom_country_code.trim();

    if selected.is_empty() {
        errors.push("Veuillez sélectionner un indicatif pays".to_string());
        return errors;
    }

    let effective_code = if selected == CUSTOM_COUNTRY_CODE {
        if custom.is_empty() {
            errors.push("Veuillez saisir un indicatif pays personnalisé".to_string());
            return errors;
        }
        if !is_valid_country_code(custom) {
            errors.push("Indicatif pays invalide. Format attendu: +XXX (1-4 chiffres)".to_string());
            return errors;
        }
        custom
    } else {
        selected
    };

    if input.phone.trim().is_empty() {
        errors.push("Veuillez saisir votre numéro de téléphone".to_string());
        return errors;
    }

    let digits = clean_digits(input.phone);
    if digits.len() < MIN_DIGITS {
        errors.push("Numéro de téléphone trop court (minimum 7 chiffres)".to_string());
    }
    if digits.len() > MAX_DIGITS {
        errors.push("Numéro de téléphone trop long (maximum 15 chiffres)".to_string());
    }

    errors.extend(validate_country_specific(effective_code, &digits));
    errors
}

fn validate_country_specific(code: &str, digits: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let len = digits.len();

    match code.trim_start_matches('+') {
        "33" => {
            if len != 9 && len != 10 {
                errors.push("Numéro français invalide (9 ou 10 chiffres attendus)".to_string());
            }
            if len == 10 && !digits.starts_with('0') {
                errors.push("Numéro français doit commencer par 0".to_string());
            }
        }
        "1" => {
            if len != 10 {
                errors.push("Numéro US/Canada invalide (10 chiffres attendus)".to_string());
            }
        }
        "44" => {
            if !(10..=11).contains(&len) {
                errors.push("Numéro UK invalide (10-11 chiffres attendus)".to_string());
            }
        }
        _ => {}
    }

    errors
}

/// Produce the stored display form, e.g. `+33 61 23 45 67 8`.
///
/// An unknown country code falls back to the default code followed by the raw
/// digits, and an out-of-range length keeps the digits ungrouped.
pub fn process_phone_number(input: &PhoneInput<'_>) -> String {
    let country_code = input.effective_country_code();
    let digits = clean_digits(input.phone);

    if !is_valid_country_code(&country_code) {
        app_log!(
            warn,
            "Invalid country code {}, falling back to {}",
            country_code,
            DEFAULT_COUNTRY_CODE
        );
        return format!("{} {}", DEFAULT_COUNTRY_CODE, digits);
    }

    if digits.len() < MIN_DIGITS || digits.len() > MAX_DIGITS {
        app_log!(warn, "Phone number has {} digits, left unformatted", digits.len());
        return format!("{} {}", country_code, digits);
    }

    format_phone_number(&country_code, &digits)
}

pub fn format_phone_number(country_code: &str, digits: &str) -> String {
    let grouped = match country_code.trim_start_matches('+') {
        "33" => format_french(digits),
        "1" => format_us(digits),
        "44" => format_uk(digits),
        _ => format_generic(digits),
    };
    format!("{} {}", country_code, grouped)
}

/// Splits `digits` at the given group sizes; callers guarantee the total length.
fn group(digits: &str, sizes: &[usize]) -> String {
    let mut parts = Vec::with_capacity(sizes.len());
    let mut start = 0;
    for size in sizes {
        parts.push(&digits[start..start + size]);
        start += size;
    }
    parts.join(" ")
}

fn format_french(digits: &str) -> String {
    let national = digits.strip_prefix('0').unwrap_or(digits);
    if national.len() == 9 {
        group(national, &[2, 2, 2, 2, 1])
    } else {
        national.to_string()
    }
}

fn format_us(digits: &str) -> String {
    if digits.len() == 10 {
        format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        digits.to_string()
    }
}

fn format_uk(digits: &str) -> String {
    let national = digits.strip_prefix('0').unwrap_or(digits);
    if national.len() != 10 {
        return national.to_string();
    }
    if national.starts_with('7') {
        group(national, &[4, 3, 3])
    } else {
        group(national, &[3, 4, 3])
    }
}

fn format_generic(digits: &str) -> String {
    let size = if digits.len() <= 8 { 2 } else { 3 };
    digits
        .as_bytes()
        .chunks(size)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn country_name(code: &str) -> &'static str {
    match code {
        "+33" => "France",
        "+1" => "États-Unis/Canada",
        "+44" => "Royaume-Uni",
        "+49" => "Allemagne",
        "+39" => "Italie",
        "+34" => "Espagne",
        "+41" => "Suisse",
        "+32" => "Belgique",
        "+31" => "Pays-Bas",
        "+212" => "Maroc",
        "+213" => "Algérie",
        "+216" => "Tunisie",
        "+262" => "La Réunion/Mayotte",
        "+590" => "Guadeloupe",
        "+594" => "Guyane",
        "+596" => "Martinique",
        _ => "Pays inconnu",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_french_number_drops_leading_zero() {
        let input = PhoneInput::new("+33", "", "06 12 34 56 78");
        assert!(validate_phone_field(&input).is_empty());
        assert_eq!(process_phone_number(&input), "+33 61 23 45 67 8");
    }

    #[test]
    fn test_unknown_country_code_falls_back_to_default() {
        let input = PhoneInput::new("999", "", "0612345678");
        assert!(validate_phone_field(&input).is_empty());
        assert_eq!(process_phone_number(&input), "+33 0612345678");
    }

    #[test]
    fn test_code_is_plus_prefixed() {
        assert_eq!(PhoneInput::new("33", "", "").effective_country_code(), "+33");
        assert_eq!(PhoneInput::new("", "", "").effective_country_code(), "+33");
        assert_eq!(
            PhoneInput::new("custom", "+852", "").effective_country_code(),
            "+852"
        );
    }

    #[test]
    fn test_us_format() {
        let input = PhoneInput::new("+1", "", "(415) 555-2671");
        assert!(validate_phone_field(&input).is_empty());
        assert_eq!(process_phone_number(&input), "+1 (415) 555-2671");
    }

    #[test]
    fn test_uk_mobile_and_landline() {
        let mobile = PhoneInput::new("custom", "44", "07911 123456");
        assert_eq!(process_phone_number(&mobile), "+44 7911 123 456");

        let landline = PhoneInput::new("+44", "", "020 1234 5678");
        assert_eq!(process_phone_number(&landline), "+44 201 2345 678");
    }

    #[test]
    fn test_generic_grouping() {
        assert_eq!(format_phone_number("+49", "30123456"), "+49 30 12 34 56");
        assert_eq!(format_phone_number("+49", "1234567"), "+49 12 34 56 7");
        assert_eq!(format_phone_number("+49", "1234567890"), "+49 123 456 789 0");
    }

    #[test]
    fn test_length_out_of_range_is_left_unformatted() {
        let input = PhoneInput::new("+49", "", "12345");
        assert_eq!(process_phone_number(&input), "+49 12345");
    }

    #[test]
    fn test_country_code_allow_list() {
        assert!(is_valid_country_code("+33"));
        assert!(is_valid_country_code("1"));
        assert!(is_valid_country_code("886"));
        assert!(!is_valid_country_code("999"));
        assert!(!is_valid_country_code("+12345"));
        assert!(!is_valid_country_code("+3a"));
        assert!(!is_valid_country_code(""));
    }

    #[test]
    fn test_validation_messages_accumulate() {
        let errors = validate_phone_field(&PhoneInput::new("+33", "", "12345"));
        assert_eq!(
            errors,
            vec![
                "Numéro de téléphone trop court (minimum 7 chiffres)".to_string(),
                "Numéro français invalide (9 ou 10 chiffres attendus)".to_string(),
            ]
        );

        let errors = validate_phone_field(&PhoneInput::new("+33", "", "1612345678"));
        assert_eq!(errors, vec!["Numéro français doit commencer par 0".to_string()]);

        let errors = validate_phone_field(&PhoneInput::new("+1", "", "555123456"));
        assert_eq!(
            errors,
            vec!["Numéro US/Canada invalide (10 chiffres attendus)".to_string()]
        );
    }

    #[test]
    fn test_custom_code_is_checked() {
        let missing = validate_phone_field(&PhoneInput::new("custom", "", "0612345678"));
        assert_eq!(missing.len(), 1);
        assert!(missing[0].contains("personnalisé"));

        let invalid = validate_phone_field(&PhoneInput::new("custom", "999", "0612345678"));
        assert_eq!(invalid.len(), 1);
        assert!(invalid[0].starts_with("Indicatif pays invalide"));
    }

    #[test]
    fn test_missing_code_stops_validation() {
        let errors = validate_phone_field(&PhoneInput::new("", "", ""));
        assert_eq!(errors, vec!["Veuillez sélectionner un indicatif pays".to_string()]);
    }

    #[test]
    fn test_country_name() {
        assert_eq!(country_name("+41"), "Suisse");
        assert_eq!(country_name("+999"), "Pays inconnu");
    }
}
