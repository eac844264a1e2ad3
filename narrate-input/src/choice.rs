/// What the user asked for at the option prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Empty line: show the next page of options.
    NextPage,
    /// `exit` or `quit`, any case.
    Exit,
    /// A 1-based option number. Range is checked by the caller.
    Option(usize),
    Invalid(String),
}

pub fn parse_choice(input: &str) -> Choice {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Choice::NextPage;
    }
    if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        return Choice::Exit;
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Choice::Invalid(trimmed.to_string());
    }
    // All digits, so only overflow fails; that is out of range, not garbage.
    Choice::Option(trimmed.parse::<usize>().unwrap_or(usize::MAX))
}
