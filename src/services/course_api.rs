// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course endpoints used by the frame message handlers.
//!
//! Payloads are opaque JSON. The only field interpreted here is the `id` of
//! list items, which drives the nested fan-out when loading a whole course.

use crate::error::{Result, ShellError};
use crate::services::gateway::HttpGateway;
use futures_util::future::try_join_all;
use serde_json::Value;
use urlencoding::encode;

/// Course content assembled from the nested resource endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseContent {
    /// Modules, each with a `lessons` array whose items carry `contents`
    pub modules: Vec<Value>,
    /// Quizzes, each with a `questions` array
    pub quizzes: Vec<Value>,
}

#[derive(Clone)]
pub struct CourseApi {
    gateway: HttpGateway,
}

impl CourseApi {
    pub fn new(gateway: HttpGateway) -> Self {
        Self { gateway }
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Load modules (with lessons and their contents) and quizzes (with
    /// questions). Any failing call fails the whole load.
    pub async fn fetch_course_content(&self, course_id: &str) -> Result<CourseContent> {
        let (modules, quizzes) = tokio::try_join!(
            self.modules_with_lessons(course_id),
            self.quizzes_with_questions(course_id),
        )?;

        tracing::debug!(
            course_id,
            modules = modules.len(),
            quizzes = quizzes.len(),
            "Course content loaded"
        );

        Ok(CourseContent { modules, quizzes })
    }

    async fn modules_with_lessons(&self, course_id: &str) -> Result<Vec<Value>> {
        let modules = self
            .list(&format!("/courses/{}/modules", encode(course_id)))
            .await?;

        try_join_all(modules.into_iter().map(|module| async move {
            let module_id = item_id(&module, "module")?;
            let lessons = self
                .list(&format!("/modules/{}/lessons", encode(&module_id)))
                .await?;

            let lessons = try_join_all(lessons.into_iter().map(|lesson| async move {
                let lesson_id = item_id(&lesson, "lesson")?;
                let contents = self
                    .list(&format!("/lessons/{}/contents", encode(&lesson_id)))
                    .await?;
                Ok::<Value, ShellError>(attach(lesson, "contents", contents))
            }))
            .await?;

            Ok::<Value, ShellError>(attach(module, "lessons", lessons))
        }))
        .await
    }

    async fn quizzes_with_questions(&self, course_id: &str) -> Result<Vec<Value>> {
        let quizzes = self
            .list(&format!("/courses/{}/quizzes", encode(course_id)))
            .await?;

        try_join_all(quizzes.into_iter().map(|quiz| async move {
            let quiz_id = item_id(&quiz, "quiz")?;
            let questions = self
                .list(&format!("/quizzes/{}/questions", encode(&quiz_id)))
                .await?;
            Ok::<Value, ShellError>(attach(quiz, "questions", questions))
        }))
        .await
    }

    pub async fn fetch_progress(&self, course_id: &str) -> Result<Value> {
        self.gateway
            .get_json(&format!("/courses/{}/progress", encode(course_id)))
            .await
    }

    // ─── Writes ──────────────────────────────────────────────────

    pub async fn create_module(&self, course_id: &str, data: Value) -> Result<Value> {
        self.gateway
            .post_json(&format!("/courses/{}/modules", encode(course_id)), data)
            .await
    }

    pub async fn create_lesson(&self, module_id: &str, data: Value) -> Result<Value> {
        self.gateway
            .post_json(&format!("/modules/{}/lessons", encode(module_id)), data)
            .await
    }

    pub async fn create_content(&self, lesson_id: &str, data: Value) -> Result<Value> {
        self.gateway
            .post_json(&format!("/lessons/{}/contents", encode(lesson_id)), data)
            .await
    }

    pub async fn create_quiz(&self, course_id: &str, data: Value) -> Result<Value> {
        self.gateway
            .post_json(&format!("/courses/{}/quizzes", encode(course_id)), data)
            .await
    }

    pub async fn create_question(&self, quiz_id: &str, data: Value) -> Result<Value> {
        self.gateway
            .post_json(&format!("/quizzes/{}/questions", encode(quiz_id)), data)
            .await
    }

    pub async fn mark_lesson_complete(&self, lesson_id: &str) -> Result<Value> {
        self.gateway
            .post_json(
                &format!("/lessons/{}/complete", encode(lesson_id)),
                Value::Object(Default::default()),
            )
            .await
    }

    /// GET a list endpoint. Accepts a bare array or `{"data": [...]}`.
    async fn list(&self, path: &str) -> Result<Vec<Value>> {
        let value: Value = self.gateway.get_json(path).await?;
        into_list(value).ok_or_else(|| ShellError::Decode(format!("{} did not return a list", path)))
    }
}

fn into_list(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

fn item_id(item: &Value, kind: &str) -> Result<String> {
    match item.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(ShellError::Decode(format!("{} without an id", kind))),
    }
}

fn attach(mut item: Value, key: &str, children: Vec<Value>) -> Value {
    if let Some(object) = item.as_object_mut() {
        object.insert(key.to_string(), Value::Array(children));
    }
    item
}
