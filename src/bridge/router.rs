// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-frame message router.
//!
//! Per inbound message: `RECEIVED -> VALIDATED -> DISPATCHED -> REPLIED`, or
//! `RECEIVED -> REJECTED`. Messages from origins outside the allow-list are
//! dropped without a reply. Unknown or malformed envelopes are ignored.
//! Every dispatched request gets exactly one reply, posted back to the frame
//! that sent it at that frame's own origin. Failures always become an
//! error-typed reply; nothing propagates across the frame boundary.

use crate::bridge::channel::FrameChannel;
use crate::bridge::origin::OriginAllowList;
use crate::models::{
    Classified, FrameRequest, InboundEnvelope, LoginCredentials, OutboundEnvelope, ShellMessage,
    TokenPair,
};
use crate::services::{CourseApi, RegisterOutcome, SessionController};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A mounted frame: its name, its known origin, and how to reach it.
pub struct FrameHandle {
    pub name: String,
    pub origin: String,
    pub channel: Arc<dyn FrameChannel>,
}

impl FrameHandle {
    pub fn new(name: impl Into<String>, origin: impl Into<String>, channel: Arc<dyn FrameChannel>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            channel,
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Sender origin not allowed. No reply, no side effects.
    Rejected,
    /// Unknown type or malformed payload. No reply.
    Ignored,
    /// Handled; this reply was posted to the frame.
    Replied(ShellMessage),
}

pub struct MessageRouter {
    allow_list: OriginAllowList,
    session: Arc<SessionController>,
    courses: CourseApi,
}

impl MessageRouter {
    pub fn new(allow_list: OriginAllowList, session: Arc<SessionController>, courses: CourseApi) -> Self {
        Self {
            allow_list,
            session,
            courses,
        }
    }

    pub fn allow_list(&self) -> &OriginAllowList {
        &self.allow_list
    }

    /// Validate, dispatch, and reply to one message from `frame`.
    ///
    /// The handler runs to completion, including any nested fan-out, before
    /// the reply is posted.
    pub async fn dispatch(&self, frame: &FrameHandle, origin: &str, payload: &Value) -> RouteOutcome {
        if !self.allow_list.allows(origin) {
            tracing::debug!(frame = %frame.name, origin, "Dropping message from untrusted origin");
            return RouteOutcome::Rejected;
        }

        let envelope = match InboundEnvelope::classify(payload) {
            Classified::Request(envelope) => envelope,
            Classified::Unknown(type_name) => {
                tracing::debug!(frame = %frame.name, type_name = %type_name, "Ignoring unknown message type");
                return RouteOutcome::Ignored;
            }
            Classified::Malformed(reason) => {
                tracing::debug!(frame = %frame.name, reason = %reason, "Ignoring malformed message");
                return RouteOutcome::Ignored;
            }
        };

        let type_name = envelope.request.type_name();
        tracing::debug!(frame = %frame.name, type_name, request_id = ?envelope.request_id, "Dispatching");

        let reply = self.handle(envelope.request).await;
        if reply.is_error() {
            tracing::warn!(frame = %frame.name, type_name, reply = ?reply, "Request failed");
        }

        let outbound = OutboundEnvelope::reply(reply.clone(), envelope.request_id);
        if let Err(e) = frame.channel.post(&outbound, &frame.origin) {
            tracing::warn!(frame = %frame.name, type_name, error = %e, "Failed to post reply");
        }

        RouteOutcome::Replied(reply)
    }

    /// Dispatch on a separate task so independent requests run concurrently.
    pub fn spawn_dispatch(
        self: &Arc<Self>,
        frame: Arc<FrameHandle>,
        origin: String,
        payload: Value,
    ) -> JoinHandle<RouteOutcome> {
        let router = Arc::clone(self);
        tokio::spawn(async move { router.dispatch(&frame, &origin, &payload).await })
    }

    async fn handle(&self, request: FrameRequest) -> ShellMessage {
        match request {
            FrameRequest::FetchCourseContent { course_id } => {
                match self.courses.fetch_course_content(&course_id).await {
                    Ok(content) => ShellMessage::CourseContentLoaded {
                        course_id,
                        modules: content.modules,
                        quizzes: content.quizzes,
                    },
                    Err(e) => ShellMessage::CourseContentError {
                        error: e.user_message(),
                    },
                }
            }
            FrameRequest::CreateModule { course_id, data } => {
                course_reply(self.courses.create_module(&course_id, data).await, |module| {
                    ShellMessage::ModuleCreated { module }
                })
            }
            FrameRequest::CreateLesson { module_id, data } => {
                course_reply(self.courses.create_lesson(&module_id, data).await, |lesson| {
                    ShellMessage::LessonCreated { lesson }
                })
            }
            FrameRequest::CreateContent { lesson_id, data } => {
                course_reply(self.courses.create_content(&lesson_id, data).await, |content| {
                    ShellMessage::ContentCreated { content }
                })
            }
            FrameRequest::CreateQuiz { course_id, data } => {
                course_reply(self.courses.create_quiz(&course_id, data).await, |quiz| {
                    ShellMessage::QuizCreated { quiz }
                })
            }
            FrameRequest::CreateQuestion { quiz_id, data } => {
                course_reply(self.courses.create_question(&quiz_id, data).await, |question| {
                    ShellMessage::QuestionCreated { question }
                })
            }
            FrameRequest::FetchCourseProgress { course_id } => {
                let result = self.courses.fetch_progress(&course_id).await;
                course_reply(result, |progress| ShellMessage::CourseProgressLoaded {
                    course_id,
                    progress,
                })
            }
            FrameRequest::MarkLessonComplete { lesson_id } => {
                let result = self.courses.mark_lesson_complete(&lesson_id).await;
                course_reply(result, |progress| ShellMessage::LessonMarkedComplete {
                    lesson_id,
                    progress,
                })
            }
            FrameRequest::AuthSuccess {
                access_token,
                refresh_token,
            } => ShellMessage::AuthCompleted {
                user: self
                    .session
                    .accept_tokens(TokenPair::new(access_token, refresh_token)),
            },
            FrameRequest::AuthLogin { email, password } => {
                auth_reply(self.session.login(&LoginCredentials { email, password }).await)
            }
            FrameRequest::AuthRegister { details } => match self.session.register(&details).await {
                Ok(RegisterOutcome::Authenticated(user)) => ShellMessage::AuthCompleted { user },
                Ok(RegisterOutcome::VerificationRequired(response)) => {
                    ShellMessage::AuthVerificationRequired { response }
                }
                Err(e) => ShellMessage::AuthError {
                    error: e.user_message(),
                },
            },
        }
    }
}

fn course_reply<F>(result: crate::error::Result<Value>, on_success: F) -> ShellMessage
where
    F: FnOnce(Value) -> ShellMessage,
{
    match result {
        Ok(value) => on_success(value),
        Err(e) => ShellMessage::CourseError {
            error: e.user_message(),
        },
    }
}

fn auth_reply(result: crate::error::Result<crate::models::UserSession>) -> ShellMessage {
    match result {
        Ok(user) => ShellMessage::AuthCompleted { user },
        Err(e) => ShellMessage::AuthError {
            error: e.user_message(),
        },
    }
}
