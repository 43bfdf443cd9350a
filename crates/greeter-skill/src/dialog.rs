//! Voice/dialog collaborator supplied by the host assistant.

use std::collections::BTreeMap;

/// Dialog spoken when one or more people are recognized; `name` lists them.
pub const KNOWN_PERSON_GREETING: &str = "known.person.greeting";
/// Dialog spoken when nobody is recognized.
pub const UNKNOWN_PERSON_GREETING: &str = "unknown.person.greeting";
pub const DONT_RECOGNIZE_YOU: &str = "I.dont.recognize.you";
/// Prompt whose answer is taken as the new person's name.
pub const ASK_FOR_NAME: &str = "ask.for.name";
/// Dialog spoken after enrolling someone; `name` is the new person.
pub const NICE_TO_MEET_YOU: &str = "nice.to.meet.you";

/// Substitution field carrying a person's name (or a comma-separated list).
pub const NAME_FIELD: &str = "name";

/// Template substitution data.
pub type DialogData = BTreeMap<String, String>;

/// Renders named dialog templates and collects spoken answers.
pub trait Dialog {
    fn speak_dialog(&mut self, key: &str, data: &DialogData);

    /// Speak `key` and block for the user's answer. `None` if nothing was heard.
    fn get_response(&mut self, key: &str) -> Option<String>;
}

/// Substitution data with a single `name` field.
pub fn name_data(name: impl Into<String>) -> DialogData {
    DialogData::from([(NAME_FIELD.to_string(), name.into())])
}
