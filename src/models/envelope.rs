// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-frame message envelopes.
//!
//! Envelopes are JSON objects tagged by a `type` field drawn from a closed
//! vocabulary. Frames send [`FrameRequest`]s; the shell answers with exactly
//! one [`ShellMessage`] per request and pushes theme/page state unprompted.
//!
//! Any envelope may carry an optional `requestId`. When present it is copied
//! onto the reply so a frame can keep several requests of the same type in
//! flight. Frames that omit it rely on the one-outstanding-request-per-type
//! convention.

use crate::models::identity::UserSession;
use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Correlation field name, shared by requests and replies.
pub const REQUEST_ID_FIELD: &str = "requestId";

/// Requests a frame may send to the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum FrameRequest {
    FetchCourseContent { course_id: String },
    CreateModule { course_id: String, data: Value },
    CreateLesson { module_id: String, data: Value },
    CreateContent { lesson_id: String, data: Value },
    CreateQuiz { course_id: String, data: Value },
    CreateQuestion { quiz_id: String, data: Value },
    FetchCourseProgress { course_id: String },
    MarkLessonComplete { lesson_id: String },
    AuthSuccess { access_token: String, refresh_token: String },
    AuthLogin { email: String, password: String },
    AuthRegister { details: Value },
}

impl FrameRequest {
    /// Every `type` tag this shell understands.
    pub const KNOWN_TYPES: [&'static str; 11] = [
        "FETCH_COURSE_CONTENT",
        "CREATE_MODULE",
        "CREATE_LESSON",
        "CREATE_CONTENT",
        "CREATE_QUIZ",
        "CREATE_QUESTION",
        "FETCH_COURSE_PROGRESS",
        "MARK_LESSON_COMPLETE",
        "AUTH_SUCCESS",
        "AUTH_LOGIN",
        "AUTH_REGISTER",
    ];

    /// Wire tag of this request.
    pub fn type_name(&self) -> &'static str {
        match self {
            FrameRequest::FetchCourseContent { .. } => "FETCH_COURSE_CONTENT",
            FrameRequest::CreateModule { .. } => "CREATE_MODULE",
            FrameRequest::CreateLesson { .. } => "CREATE_LESSON",
            FrameRequest::CreateContent { .. } => "CREATE_CONTENT",
            FrameRequest::CreateQuiz { .. } => "CREATE_QUIZ",
            FrameRequest::CreateQuestion { .. } => "CREATE_QUESTION",
            FrameRequest::FetchCourseProgress { .. } => "FETCH_COURSE_PROGRESS",
            FrameRequest::MarkLessonComplete { .. } => "MARK_LESSON_COMPLETE",
            FrameRequest::AuthSuccess { .. } => "AUTH_SUCCESS",
            FrameRequest::AuthLogin { .. } => "AUTH_LOGIN",
            FrameRequest::AuthRegister { .. } => "AUTH_REGISTER",
        }
    }
}

/// Messages the shell posts into a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ShellMessage {
    CourseContentLoaded {
        course_id: String,
        modules: Vec<Value>,
        quizzes: Vec<Value>,
    },
    CourseContentError { error: String },
    ModuleCreated { module: Value },
    LessonCreated { lesson: Value },
    ContentCreated { content: Value },
    QuizCreated { quiz: Value },
    QuestionCreated { question: Value },
    CourseProgressLoaded { course_id: String, progress: Value },
    LessonMarkedComplete { lesson_id: String, progress: Value },
    /// Shared error reply for course authoring and progress requests.
    CourseError { error: String },
    AuthCompleted { user: UserSession },
    AuthVerificationRequired { response: Value },
    AuthError { error: String },
    ThemeChange { theme: String },
    PageChange { page: String },
}

impl ShellMessage {
    /// True for error-typed replies.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ShellMessage::CourseContentError { .. }
                | ShellMessage::CourseError { .. }
                | ShellMessage::AuthError { .. }
        )
    }
}

/// A validated inbound request plus its optional correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEnvelope {
    pub request: FrameRequest,
    pub request_id: Option<String>,
}

/// Result of checking a raw payload against the closed vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Request(InboundEnvelope),
    /// Well-formed object whose `type` we do not know. Ignored.
    Unknown(String),
    /// Not an object, no string `type`, or a known type with a bad payload.
    Malformed(String),
}

impl InboundEnvelope {
    /// Classify an untyped payload.
    pub fn classify(raw: &Value) -> Classified {
        let Some(object) = raw.as_object() else {
            return Classified::Malformed("envelope is not an object".to_string());
        };

        let Some(type_name) = object.get("type").and_then(Value::as_str) else {
            return Classified::Malformed("envelope has no type tag".to_string());
        };

        if !FrameRequest::KNOWN_TYPES.contains(&type_name) {
            return Classified::Unknown(type_name.to_string());
        }

        let request_id = object
            .get(REQUEST_ID_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string);

        match serde_json::from_value::<FrameRequest>(raw.clone()) {
            Ok(request) => Classified::Request(InboundEnvelope {
                request,
                request_id,
            }),
            Err(e) => Classified::Malformed(format!("{}: {}", type_name, e)),
        }
    }

    /// Parse a JSON text payload.
    pub fn classify_str(raw: &str) -> Classified {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::classify(&value),
            Err(e) => Classified::Malformed(format!("invalid JSON: {}", e)),
        }
    }
}

/// An outbound message with the correlation id of the request it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEnvelope {
    pub message: ShellMessage,
    pub request_id: Option<String>,
}

impl OutboundEnvelope {
    /// Reply to a request, carrying its correlation id.
    pub fn reply(message: ShellMessage, request_id: Option<String>) -> Self {
        Self {
            message,
            request_id,
        }
    }

    /// Unsolicited push (theme/page state).
    pub fn push(message: ShellMessage) -> Self {
        Self {
            message,
            request_id: None,
        }
    }

    /// Wire form.
    pub fn to_value(&self) -> Value {
        let mut value = serde_json::to_value(&self.message).unwrap_or(Value::Null);
        if let (Some(id), Some(object)) = (&self.request_id, value.as_object_mut()) {
            object.insert(REQUEST_ID_FIELD.to_string(), Value::String(id.clone()));
        }
        value
    }
}
