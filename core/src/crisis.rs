//! Crisis keyword interception.
//!
//! A deliberately blunt, zero-false-negative-oriented filter: any message
//! containing one of the fixed phrases as a case-insensitive substring is
//! answered with the static hotline message instead of a provider call.
//! False positives ("the plant will die") are the safe failure direction.

const CRISIS_PHRASES: &[&str] = &[
    "suicide",
    "kill myself",
    "end it all",
    "hurt myself",
    "die",
    "worthless",
];

pub const CRISIS_RESPONSE: &str = "\u{1F6A8} I'm concerned about what you've shared. Your feelings are valid, but help is available.\n\n\
**Please reach out immediately:**\n\
- **India - Suicide Prevention**: 104 (24/7)\n\
- **KIRAN Mental Health**: 1800-599-0019\n\
- **Vandrevala Foundation**: 9999666555\n\
- **iCall Psychosocial Helpline**: 9152987821\n\n\
You don't have to face this alone. Would you like to talk about what's making you feel this way?";

/// Returns true when the text contains any crisis phrase, case-insensitively.
pub fn classify(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CRISIS_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_phrase_matches_itself() {
        for phrase in CRISIS_PHRASES {
            assert!(classify(phrase), "phrase {phrase:?} should match");
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(classify("I want to KILL MYSELF"));
        assert!(classify("Suicide"));
        assert!(classify("i feel WorthLess today"));
    }

    #[test]
    fn substring_matches_are_intentional() {
        assert!(classify("the plant will die if I forget to water it"));
        assert!(classify("sometimes I want to end it all, nothing helps"));
    }

    #[test]
    fn clean_text_does_not_match() {
        assert!(!classify("my daughter is stressed about her exams"));
        assert!(!classify("how do I talk to my parents about grades?"));
        assert!(!classify(""));
    }
}
