use serde::{Deserialize, Serialize};

/// One of the two fixed tutoring characters. Statically defined; a persona
/// determines the skill mode and the synthesis voice, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    AteMaria,
    KuyaJosh,
}

/// Instruction tier the persona teaches at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillMode {
    Beginner,
    Heritage,
}

impl Persona {
    /// Closed persona -> skill mode mapping. Adding a persona means adding
    /// one variant here and one character layer in the prompt composer.
    pub fn skill_mode(self) -> SkillMode {
        match self {
            Persona::AteMaria => SkillMode::Beginner,
            Persona::KuyaJosh => SkillMode::Heritage,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Persona::AteMaria => "Ate Maria",
            Persona::KuyaJosh => "Kuya Josh",
        }
    }

    /// Voice id used by the speech synthesis proxy.
    pub fn voice(self) -> &'static str {
        match self {
            Persona::AteMaria => "nova",
            Persona::KuyaJosh => "onyx",
        }
    }

    /// Phrase substituted for an empty inbound message so the model opens
    /// the conversation instead of receiving an empty user turn.
    pub fn greeting_trigger(self) -> &'static str {
        match self {
            Persona::AteMaria => {
                "Please greet me warmly and start our very first beginner Tagalog lesson."
            }
            Persona::KuyaJosh => {
                "Batiin mo ako at simulan na natin ang kwentuhan natin sa Tagalog."
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::AteMaria => "ate_maria",
            Persona::KuyaJosh => "kuya_josh",
        }
    }
}

impl SkillMode {
    /// Stored under the generic `tone` column for schema-reuse reasons.
    pub fn as_str(self) -> &'static str {
        match self {
            SkillMode::Beginner => "beginner",
            SkillMode::Heritage => "heritage",
        }
    }
}
