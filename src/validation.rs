//! Pure, per-field validation rules shared by the application's forms.
//!
//! Each function checks a single raw field value against one rule set and
//! returns the first failing rule's message. Forms run one function per field
//! and accumulate the results into a [ValidationErrors].

use std::sync::LazyLock;

use regex::Regex;
use time::Date;

/// Accumulated per-field validation failures, in insertion order.
///
/// Within a field the first failing rule wins, across fields all failures are
/// collected so a re-rendered form can show every problem at once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<(&'static str, String)>);

impl ValidationErrors {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`. Later failures for the same field are
    /// ignored, matching first-failing-rule-wins semantics.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field, message.into()));
        }
    }

    /// The error message for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    /// Whether no field failed validation.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, message)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }
}

/// Domains of throwaway email providers that are rejected at registration.
const DISPOSABLE_EMAIL_DOMAINS: [&str; 9] = [
    "tempmail.com",
    "10minutemail.com",
    "guerrillamail.com",
    "mailinator.com",
    "yopmail.com",
    "dispostable.com",
    "trashmail.com",
    "fakeinbox.com",
    "getairmail.com",
];

/// The maximum length of an email address.
const EMAIL_MAX_LENGTH: usize = 120;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("invalid email regex")
});

/// Check an email address for format, length and disposable-provider domains.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > EMAIL_MAX_LENGTH {
        return Err(format!("Email must not exceed {EMAIL_MAX_LENGTH} characters"));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Enter a valid email address".to_string());
    }

    let domain = email
        .rsplit('@')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if DISPOSABLE_EMAIL_DOMAINS.contains(&domain.as_str()) {
        return Err("Disposable email addresses are not allowed".to_string());
    }

    Ok(())
}

/// Passwords that are rejected outright regardless of their composition.
const COMMON_PASSWORDS: [&str; 8] = [
    "password",
    "12345678",
    "qwerty123",
    "admin123",
    "letmein",
    "welcome",
    "password123",
    "abc123",
];

/// The punctuation set that counts as a special character in a password.
const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Check a new password against the strength rules.
///
/// Requires 8-128 characters with at least one digit and one ASCII letter,
/// plus one special character when `require_special` is set, and rejects a
/// fixed list of common passwords (case-insensitive).
pub fn validate_password_strength(password: &str, require_special: bool) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }

    if password.chars().count() > 128 {
        return Err("Password must not exceed 128 characters".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Password must contain at least one letter".to_string());
    }

    if require_special && !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        return Err("Password must contain at least one special character".to_string());
    }

    if COMMON_PASSWORDS.contains(&password.to_ascii_lowercase().as_str()) {
        return Err("This password is too common".to_string());
    }

    Ok(())
}

/// Reject dates after `today`, and `today` itself when `allow_today` is false.
///
/// Transactions record events that have already happened, so future dates are
/// never valid.
pub fn validate_date_not_future(date: Date, today: Date, allow_today: bool) -> Result<(), String> {
    if date > today || (!allow_today && date == today) {
        return Err("Date cannot be in the future".to_string());
    }

    Ok(())
}

/// Parse and range-check a monetary amount.
///
/// Accepts values with at most two decimal places in `min..=max`. The
/// two-decimal check compares the amount scaled by 100 against its nearest
/// integer with a small epsilon, so binary-float noise on values like `0.29`
/// does not cause spurious rejections.
pub fn validate_amount(raw: &str, min: f64, max: f64) -> Result<f64, String> {
    let amount: f64 = raw
        .trim()
        .parse()
        .map_err(|_| "Enter a valid amount".to_string())?;

    if amount < min {
        return Err(format!("Minimum amount is {min}"));
    }

    if amount > max {
        return Err(format!("Maximum amount is {max}"));
    }

    let scaled = amount * 100.0;
    if (scaled - scaled.round()).abs() > 0.001 {
        return Err("Amount must have at most two decimal places".to_string());
    }

    Ok(amount)
}

static HEX_COLOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("invalid hex regex"));

/// Check a display color in `#RGB` or `#RRGGBB` form.
pub fn validate_hex_color(color: &str) -> Result<(), String> {
    if color.is_empty() {
        return Err("Color is required".to_string());
    }

    if !HEX_COLOR_REGEX.is_match(color) {
        return Err("Enter a valid HEX color (#RRGGBB or #RGB)".to_string());
    }

    Ok(())
}

/// Mobile operator prefixes accepted for Russian phone numbers.
///
/// The first three digits of the subscriber number must be in this set.
const RUSSIAN_OPERATOR_CODES: [&str; 77] = [
    "900", "901", "902", "903", "904", "905", "906", "908", "909", "910", "911", "912", "913",
    "914", "915", "916", "917", "918", "919", "920", "921", "922", "923", "924", "925", "926",
    "927", "928", "929", "930", "931", "932", "933", "934", "936", "937", "938", "939", "941",
    "950", "951", "952", "953", "954", "955", "956", "958", "960", "961", "962", "963", "964",
    "965", "966", "967", "968", "969", "970", "971", "972", "973", "974", "975", "976", "977",
    "978", "979", "980", "981", "982", "983", "984", "985", "986", "987", "988", "989",
];

/// Check a Russian phone number.
///
/// Strips all non-digit characters, then accepts 10 digits, or 11 digits
/// starting with `7` or `8` (the country code is stripped). The next three
/// digits must be a known mobile operator code.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let mut digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => {}
        11 => {
            if !digits.starts_with('7') && !digits.starts_with('8') {
                return Err("Invalid country code".to_string());
            }
            digits.remove(0);
        }
        _ => return Err("Invalid phone number length".to_string()),
    }

    let operator_code = &digits[..3];
    if !RUSSIAN_OPERATOR_CODES.contains(&operator_code) {
        return Err("Invalid mobile operator code".to_string());
    }

    Ok(())
}

/// Usernames that are never available for registration.
const RESERVED_USERNAMES: [&str; 8] = [
    "admin",
    "administrator",
    "root",
    "superuser",
    "support",
    "help",
    "info",
    "contact",
];

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("invalid username regex"));

/// Check a username: 3-50 characters, letters/digits/underscores, not reserved.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    let length = username.chars().count();
    if !(3..=50).contains(&length) {
        return Err("Username must be between 3 and 50 characters".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err("Username may only contain letters, digits and underscores".to_string());
    }

    if RESERVED_USERNAMES.contains(&username.to_ascii_lowercase().as_str()) {
        return Err("This username is reserved".to_string());
    }

    Ok(())
}

static CATEGORY_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Zа-яА-Я0-9\s\-_]+$").expect("invalid category name regex")
});

/// Check a category name: 2-50 characters of Latin or Cyrillic letters,
/// digits, spaces, hyphens and underscores.
pub fn validate_category_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Category name is required".to_string());
    }

    let length = name.chars().count();
    if !(2..=50).contains(&length) {
        return Err("Category name must be between 2 and 50 characters".to_string());
    }

    if !CATEGORY_NAME_REGEX.is_match(name) {
        return Err(
            "Category name may only contain letters, digits, spaces, hyphens and underscores"
                .to_string(),
        );
    }

    Ok(())
}

static ICON_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^fa[a-z]?-?[a-z0-9-]+$").expect("invalid icon regex"));

/// Check a Font Awesome icon class name, e.g. `fa-shopping-cart`.
pub fn validate_icon(icon: &str) -> Result<(), String> {
    if icon.chars().count() > 50 {
        return Err("Icon name must not exceed 50 characters".to_string());
    }

    if !ICON_REGEX.is_match(icon) {
        return Err("Enter a valid Font Awesome class (e.g. fa-shopping-cart)".to_string());
    }

    Ok(())
}


#[cfg(test)]
mod password_tests {
    use super::validate_password_strength;

    #[test]
    fn accepts_strong_password() {
        assert!(validate_password_strength("correct4horse!", true).is_ok());
    }

    #[test]
    fn rejects_short_password() {
        assert!(validate_password_strength("a1!b2", true).is_err());
    }

    #[test]
    fn rejects_over_long_password() {
        let password = format!("a1!{}", "x".repeat(128));
        assert!(validate_password_strength(&password, true).is_err());
    }

    #[test]
    fn rejects_password_without_digit() {
        assert!(validate_password_strength("onlyletters!", true).is_err());
    }

    #[test]
    fn rejects_password_without_letter() {
        assert!(validate_password_strength("12345678!", true).is_err());
    }

    #[test]
    fn rejects_password_without_special_only_when_required() {
        assert!(validate_password_strength("letters123", true).is_err());
        assert!(validate_password_strength("letters123", false).is_ok());
    }

    #[test]
    fn rejects_common_password_case_insensitive() {
        // "qwerty123" has letters and digits but is on the common list.
        assert!(validate_password_strength("Qwerty123", false).is_err());
    }
}



#[cfg(test)]
mod hex_color_tests {
    use super::validate_hex_color;

    #[test]
    fn accepts_short_and_long_forms() {
        assert!(validate_hex_color("#abc").is_ok());
        assert!(validate_hex_color("#3498db").is_ok());
        assert!(validate_hex_color("#3498DB").is_ok());
    }

    #[test]
    fn rejects_missing_hash_and_bad_lengths() {
        assert!(validate_hex_color("3498db").is_err());
        assert!(validate_hex_color("#3498d").is_err());
        assert!(validate_hex_color("#zzzzzz").is_err());
        assert!(validate_hex_color("").is_err());
    }
}

#[cfg(test)]
mod phone_tests {
    use super::validate_phone;

    #[test]
    fn accepts_whitelisted_operator_with_country_code() {
        assert!(validate_phone("+79161234567").is_ok());
    }

    #[test]
    fn accepts_ten_digit_number() {
        assert!(validate_phone("9161234567").is_ok());
    }

    #[test]
    fn accepts_formatting_characters() {
        assert!(validate_phone("8 (916) 123-45-67").is_ok());
    }

    #[test]
    fn rejects_unknown_operator_code() {
        // 999 is not on the operator whitelist.
        assert!(validate_phone("+79991234567").is_err());
    }

    #[test]
    fn rejects_bad_country_code() {
        assert!(validate_phone("+19161234567").is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(validate_phone("916123").is_err());
        assert!(validate_phone("791612345678").is_err());
    }
}

#[cfg(test)]
mod username_tests {
    use super::validate_username;

    #[test]
    fn accepts_plain_username() {
        assert!(validate_username("alice_92").is_ok());
    }

    #[test]
    fn rejects_reserved_names() {
        assert!(validate_username("admin").is_err());
        assert!(validate_username("Root").is_err());
    }

    #[test]
    fn rejects_bad_characters_and_lengths() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }
}

#[cfg(test)]
mod category_name_tests {
    use super::validate_category_name;

    #[test]
    fn accepts_latin_and_cyrillic() {
        assert!(validate_category_name("Groceries").is_ok());
        assert!(validate_category_name("Продукты").is_ok());
        assert!(validate_category_name("Car - fuel_2024").is_ok());
    }

    #[test]
    fn rejects_punctuation_and_short_names() {
        assert!(validate_category_name("a").is_err());
        assert!(validate_category_name("food!").is_err());
    }
}

#[cfg(test)]
mod icon_tests {
    use super::validate_icon;

    #[test]
    fn accepts_font_awesome_classes() {
        assert!(validate_icon("fa-shopping-cart").is_ok());
        assert!(validate_icon("fa-folder").is_ok());
        assert!(validate_icon("fas-home").is_ok());
    }

    #[test]
    fn rejects_arbitrary_strings() {
        assert!(validate_icon("shopping-cart").is_err());
        assert!(validate_icon("fa-ShoppingCart").is_err());
    }
}

#[cfg(test)]
mod validation_errors_tests {
    use super::ValidationErrors;

    #[test]
    fn first_error_per_field_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "first");
        errors.add("email", "second");

        assert_eq!(errors.get("email"), Some("first"));
    }

    #[test]
    fn errors_accumulate_across_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "bad email");
        errors.add("password", "bad password");

        let collected: Vec<_> = errors.iter().collect();
        assert_eq!(
            collected,
            vec![("email", "bad email"), ("password", "bad password")]
        );
    }
}
