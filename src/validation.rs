/// Normalize an account id cell read from a sheet.
///
/// Spreadsheet exports store account ids as numbers and drop leading zeros,
/// so all-digit ids shorter than 12 characters are left-padded.
/// Returns `None` when the result is not a 12-digit id.
pub fn normalize_account_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    // "123456789012.0" from float-typed cells
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);

    if trimmed.is_empty() || trimmed.len() > 12 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(format!("{:0>12}", trimmed))
}

/// Build the ARN of a role in the target account
pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}
