//! User-facing texts for notices and synthesized assistant turns.

use serde::{Deserialize, Serialize};

use crate::domain::run::RunType;
use crate::errors::FailureKind;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Self::Es),
            "en" => Ok(Self::En),
            other => Err(format!("unsupported locale `{other}` (expected es|en)")),
        }
    }
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }

    pub fn success_title(&self) -> &'static str {
        match self {
            Self::Es => "✅ Recomendación generada",
            Self::En => "✅ Recommendation ready",
        }
    }

    pub fn success_description(&self, run_type: RunType) -> String {
        let label = run_type.label().unwrap_or("Run 1");
        match self {
            Self::Es => format!("Análisis de 360° completado ({label})"),
            Self::En => format!("360° analysis completed ({label})"),
        }
    }

    pub fn error_title(&self) -> &'static str {
        "❌ Error"
    }

    pub fn failure_message(&self, kind: FailureKind) -> &'static str {
        match (self, kind) {
            (Self::Es, FailureKind::RateLimited) => {
                "Límite de solicitudes excedido. Por favor espera un momento."
            }
            (Self::Es, FailureKind::QuotaExhausted) => {
                "Créditos agotados. Por favor añade fondos a tu workspace."
            }
            (Self::Es, FailureKind::Generic) => "Ocurrió un error al generar la recomendación",
            (Self::En, FailureKind::RateLimited) => {
                "Request limit exceeded. Please wait a moment before trying again."
            }
            (Self::En, FailureKind::QuotaExhausted) => {
                "Credits exhausted. Please add funds to your workspace."
            }
            (Self::En, FailureKind::Generic) => {
                "An error occurred while generating the recommendation"
            }
        }
    }

    /// Body of the assistant turn recorded when a run fails.
    pub fn failure_turn(&self, kind: FailureKind) -> String {
        let message = self.failure_message(kind);
        match self {
            Self::Es => format!("Lo siento, {message}"),
            Self::En => format!("Sorry, {}", lowercase_first(message)),
        }
    }

    pub fn warning_title(&self) -> &'static str {
        match self {
            Self::Es => "⚠️ Advertencia",
            Self::En => "⚠️ Warning",
        }
    }

    pub fn baseline_required(&self) -> &'static str {
        match self {
            Self::Es => "Primero debes ejecutar el análisis baseline (Run 1)",
            Self::En => "Run the baseline analysis (Run 1) first",
        }
    }

    pub fn busy(&self) -> &'static str {
        match self {
            Self::Es => "Ya hay una recomendación en curso. Espera a que termine.",
            Self::En => "A recommendation is already in progress. Wait for it to finish.",
        }
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
