//! AI coach chats and the text-completion client behind them.

use chrono::DateTime;
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::CoachError;
use crate::metrics;
use crate::model::{
    BodyMetric, ChatMessage, ChatRole, ChatSession, CompletedWorkout, Millis, UserProfile,
};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Shown in place of a reply when the completion call fails.
pub const ERROR_REPLY: &str = "⚠️ Error al obtener respuesta. Por favor intenta de nuevo.";

const TITLE_MAX_CHARS: usize = 35;
const DAY_MS: Millis = 24 * 60 * 60 * 1000;
const NO_WORKOUT_DAYS: i64 = 999;

/// Determine the API key to use for completion requests.
///
/// If the `GEMINI_API_KEY` environment variable is set, its value takes
/// precedence over any key provided in the application settings.
pub fn resolve_api_key(settings_key: Option<&str>) -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .or_else(|| settings_key.map(|s| s.to_string()))
}

/// A text-completion backend.
pub trait CoachClient {
    /// Answer `message` given the earlier `history` and a system prompt.
    fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, CoachError>;
}

/// Client for a `generateContent` style completion endpoint.
#[derive(Debug, Clone)]
pub struct HttpCoach {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpCoach {
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(10))
                .build(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    fn request_body(system: &str, history: &[ChatMessage], message: &str) -> Value {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                };
                json!({"role": role, "parts": [{"text": m.text}]})
            })
            .collect();
        contents.push(json!({"role": "user", "parts": [{"text": message}]}));
        json!({
            "systemInstruction": {"parts": [{"text": system}]},
            "contents": contents,
            "generationConfig": {"temperature": 0.7, "maxOutputTokens": 4096},
        })
    }
}

impl CoachClient for HttpCoach {
    fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, CoachError> {
        let key = self.api_key.as_deref().ok_or(CoachError::MissingApiKey)?;
        let url = format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model);
        let response: Value = self
            .agent
            .post(&url)
            .query("key", key)
            .send_json(Self::request_body(system, history, message))
            .map_err(|e| CoachError::Request(e.to_string()))?
            .into_json()
            .map_err(|e| CoachError::Request(e.to_string()))?;

        response
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .ok_or(CoachError::EmptyResponse)
    }
}

/// Data the coach sees about the athlete.
#[derive(Debug, Clone, Copy)]
pub struct CoachContext<'a> {
    pub profile: Option<&'a UserProfile>,
    pub history: &'a [CompletedWorkout],
    pub metrics: &'a [BodyMetric],
}

impl CoachContext<'_> {
    pub fn days_since_last_workout(&self, now: Millis) -> i64 {
        self.history
            .last()
            .map(|w| (now - w.date).div_euclid(DAY_MS))
            .unwrap_or(NO_WORKOUT_DAYS)
    }

    fn recent_history(&self) -> String {
        let start = self.history.len().saturating_sub(3);
        self.history[start..]
            .iter()
            .map(|w| {
                let date = DateTime::from_timestamp_millis(w.date)
                    .map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_default();
                let prs = if w.prs.is_empty() {
                    "Ninguno".to_string()
                } else {
                    w.prs.join(", ")
                };
                format!(
                    "- {date}: {} ({}). PRs: {prs}. Vol: {}",
                    w.sub_routine_name,
                    w.program_name,
                    w.total_volume.round()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// System prompt describing the coach persona and the athlete.
    pub fn system_prompt(&self, now: Millis) -> String {
        let latest = self.metrics.last();
        let (weight, unit, change) = match latest {
            Some(m) => (
                format!("{}", m.weight),
                m.unit.to_string(),
                metrics::weight_change(self.metrics, m.unit)
                    .map(|c| format!("{c:.1}"))
                    .unwrap_or_else(|| "0".into()),
            ),
            None => ("?".into(), String::new(), "0".into()),
        };
        let name = self.profile.map(|p| p.name.as_str()).unwrap_or("Atleta");
        let goal = self
            .profile
            .and_then(|p| serde_json::to_value(p.goal).ok())
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "General".into());
        let level = self
            .profile
            .and_then(|p| serde_json::to_value(p.experience_level).ok())
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "Intermedio".into());
        let recent = self.recent_history();
        let recent = if recent.is_empty() {
            "No hay historial reciente.".to_string()
        } else {
            recent
        };

        format!(
            "Eres Titan Coach, un entrenador personal de élite. Tu estilo es técnico, \
             motivador, directo y basado en evidencia.\n\n\
             ### PERFIL DEL ATLETA:\n\
             - Nombre: {name}\n\
             - Objetivo: {goal}\n\
             - Nivel: {level}\n\
             - Peso Actual: {weight} {unit} (Cambio total: {change})\n\
             - Días sin entrenar: {days}\n\n\
             ### HISTORIAL RECIENTE:\n{recent}\n",
            days = self.days_since_last_workout(now),
        )
    }
}

/// Open a new chat with a greeting from the coach.
pub fn new_chat(profile: Option<&UserProfile>, now: Millis) -> ChatSession {
    let name = profile.map(|p| p.name.as_str()).unwrap_or("Atleta");
    ChatSession {
        id: format!("chat_{now}"),
        title: "Nueva Sesión".into(),
        created_at: now,
        last_message_at: now,
        messages: vec![ChatMessage {
            id: "welcome".into(),
            role: ChatRole::Model,
            text: format!(
                "¡Hola {name}! 👋\n\nSoy **Titan Coach**, tu asistente de entrenamiento con IA.\n\n\
                 ### ¿En qué puedo ayudarte?\n- 📊 Analizar tu progreso\n- 🍎 Consejos de nutrición\n\
                 - 💪 Ajustar tu rutina\n- 🏋️ Técnica de ejercicios\n\n¡Pregúntame lo que quieras!"
            ),
            timestamp: now,
        }],
    }
}

fn title_from(input: &str) -> String {
    if input.chars().count() > TITLE_MAX_CHARS {
        let head: String = input.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        input.to_string()
    }
}

/// Post `input` to `chat` and append the coach's reply.
///
/// Blank input is ignored and returns `false`. A failed completion is
/// replaced by [`ERROR_REPLY`] so the conversation can continue.
pub fn send_message(
    chat: &mut ChatSession,
    input: &str,
    context: &CoachContext<'_>,
    client: &dyn CoachClient,
    now: Millis,
) -> bool {
    if input.trim().is_empty() {
        return false;
    }
    let prior = chat.messages.clone();
    if chat.messages.len() <= 1 {
        chat.title = title_from(input);
    }
    chat.messages.push(ChatMessage {
        id: now.to_string(),
        role: ChatRole::User,
        text: input.to_string(),
        timestamp: now,
    });
    chat.last_message_at = now;

    let reply = match client.complete(&context.system_prompt(now), &prior, input) {
        Ok(text) => text,
        Err(e) => {
            log::error!("Coach error: {e}");
            ERROR_REPLY.to_string()
        }
    };
    chat.messages.push(ChatMessage {
        id: (now + 1).to_string(),
        role: ChatRole::Model,
        text: reply,
        timestamp: now,
    });
    chat.last_message_at = now;
    true
}
