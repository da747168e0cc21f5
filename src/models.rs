use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderNuance {
    Masculine,
    Feminine,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStyle {
    /// Given name built from hanja-backed syllables.
    SinoKorean,
    /// Given name built from native Korean words.
    PureKorean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    #[default]
    Simple,
    Detailed,
}

/// The three response shapes the service knows how to ask for and check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultVariant {
    FreeSimple,
    FreeDetailed,
    Premium,
}

impl ResultVariant {
    #[cfg(test)]
    pub const ALL: [ResultVariant; 3] = [ResultVariant::FreeSimple, ResultVariant::FreeDetailed, ResultVariant::Premium];

    pub fn select(tier: Tier, detail: DetailLevel) -> Self {
        match (tier, detail) {
            (Tier::Premium, _) => ResultVariant::Premium,
            (Tier::Free, DetailLevel::Simple) => ResultVariant::FreeSimple,
            (Tier::Free, DetailLevel::Detailed) => ResultVariant::FreeDetailed,
        }
    }

    pub fn tier(self) -> Tier {
        match self {
            ResultVariant::Premium => Tier::Premium,
            ResultVariant::FreeSimple | ResultVariant::FreeDetailed => Tier::Free,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("original name must not be empty")]
    EmptyName,
}

/// Per-request input to the naming pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOptions {
    original_name: String,
    pub gender: GenderNuance,
    pub script_style: ScriptStyle,
    pub tier: Tier,
    pub detail: DetailLevel,
}

impl GenerationOptions {
    pub fn new(
        original_name: &str,
        gender: GenderNuance,
        script_style: ScriptStyle,
        tier: Tier,
        detail: DetailLevel,
    ) -> Result<Self, OptionsError> {
        let original_name = original_name.trim();
        if original_name.is_empty() {
            return Err(OptionsError::EmptyName);
        }
        Ok(Self {
            original_name: original_name.to_string(),
            gender,
            script_style,
            tier,
            detail,
        })
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn variant(&self) -> ResultVariant {
        ResultVariant::select(self.tier, self.detail)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NameRequest {
    pub original_name: String,
    pub gender: GenderNuance,
    pub script_style: ScriptStyle,
    pub tier: Tier,
    #[serde(default)]
    pub detail: DetailLevel,
    #[serde(default)]
    pub request_id: Option<String>, // idempotency key when no header is sent
}

impl NameRequest {
    pub fn to_options(&self) -> Result<GenerationOptions, OptionsError> {
        GenerationOptions::new(&self.original_name, self.gender, self.script_style, self.tier, self.detail)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct NamingRecord {
    pub request_id: String,
    pub variant: ResultVariant,
    pub options: GenerationOptions,
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
