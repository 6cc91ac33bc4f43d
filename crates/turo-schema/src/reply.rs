use serde::{Deserialize, Serialize};

/// The structured tutoring payload the model must produce.
///
/// `tagalog` is the spoken reply and is never empty once validated. The
/// remaining fields are per-turn teaching context and all nullable:
/// `sabihin` is a pronunciation hint, `meaning` an English gloss,
/// `correction` feedback on the learner's last utterance, `examples` extra
/// usage sentences and `note` a free-form cultural or grammar note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorReply {
    pub tagalog: String,
    #[serde(default)]
    pub sabihin: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub correction: Option<String>,
    #[serde(default)]
    pub examples: Option<Vec<String>>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TutorReply {
    pub fn new(tagalog: impl Into<String>) -> Self {
        Self {
            tagalog: tagalog.into(),
            ..Self::default()
        }
    }
}
