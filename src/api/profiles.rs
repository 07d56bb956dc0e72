//! Profile API endpoints.
//!
//! Public profile views are optional-auth: anonymous callers get the
//! profile, authenticated callers additionally learn whether they follow
//! the member. Mutations operate on the caller's own profile and the skill
//! and experience endpoints are full-snapshot reconciliations.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{ApiAuth, OptionalAuth};
use crate::db::{Database, Experience, ExperienceInput, Skill};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct ProfilesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(ProfilesState);

pub fn router(state: ProfilesState) -> Router {
    Router::new()
        .route("/me", put(update_profile))
        .route("/me/skills", put(replace_skills))
        .route("/me/experiences", put(replace_experiences))
        .route("/{username}", get(view_profile))
        .with_state(state)
}

#[derive(Serialize)]
struct ProfileResponse {
    uuid: String,
    username: String,
    display_name: String,
    headline: String,
    about: String,
    location: String,
    skills: Vec<Skill>,
    experiences: Vec<Experience>,
    followers: i64,
    following: i64,
    /// Only present for authenticated viewers
    #[serde(skip_serializing_if = "Option::is_none")]
    viewer_follows: Option<bool>,
}

/// Public profile view. Optional auth: anonymous callers are served too.
async fn view_profile(
    State(state): State<ProfilesState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_username(&username)
        .await
        .db_err("Failed to get user")?
        .filter(|u| u.active)
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    let profile = state
        .db
        .profiles()
        .get(user.id)
        .await
        .db_err("Failed to get profile")?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    let skills = state
        .db
        .profiles()
        .list_skills(user.id)
        .await
        .db_err("Failed to list skills")?;

    let experiences = state
        .db
        .profiles()
        .list_experiences(user.id)
        .await
        .db_err("Failed to list experiences")?;

    let followers = state
        .db
        .follows()
        .count_followers(user.id)
        .await
        .db_err("Failed to count followers")?;

    let following = state
        .db
        .follows()
        .count_following(user.id)
        .await
        .db_err("Failed to count following")?;

    let viewer_follows = match &viewer {
        Some(auth) if auth.user_id != user.id => Some(
            state
                .db
                .follows()
                .is_following(auth.user_id, user.id)
                .await
                .db_err("Failed to check follow status")?,
        ),
        _ => None,
    };

    Ok((
        StatusCode::OK,
        Json(ProfileResponse {
            uuid: user.uuid,
            username: user.username,
            display_name: user.display_name,
            headline: profile.headline,
            about: profile.about,
            location: profile.location,
            skills,
            experiences,
            followers,
            following,
            viewer_follows,
        }),
    ))
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    about: String,
    #[serde(default)]
    location: String,
}

async fn update_profile(
    State(state): State<ProfilesState>,
    ApiAuth(auth): ApiAuth,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.headline.len() > 120 {
        return Err(ApiError::bad_request("Headline is too long"));
    }
    if payload.about.len() > 4000 {
        return Err(ApiError::bad_request("About is too long"));
    }
    if payload.location.len() > 120 {
        return Err(ApiError::bad_request("Location is too long"));
    }

    let updated = state
        .db
        .profiles()
        .update(
            auth.user_id,
            payload.headline.trim(),
            payload.about.trim(),
            payload.location.trim(),
        )
        .await
        .db_err("Failed to update profile")?;

    if !updated {
        return Err(ApiError::not_found("Profile not found"));
    }

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true }))))
}

#[derive(Deserialize)]
struct ReplaceSkillsRequest {
    skills: Vec<String>,
}

const MAX_SKILLS: usize = 50;

async fn replace_skills(
    State(state): State<ProfilesState>,
    ApiAuth(auth): ApiAuth,
    Json(payload): Json<ReplaceSkillsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.skills.len() > MAX_SKILLS {
        return Err(ApiError::bad_request("Too many skills"));
    }

    // Trim, drop empties, and dedupe while preserving submitted order
    let mut names: Vec<String> = Vec::with_capacity(payload.skills.len());
    for raw in &payload.skills {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("Skill name cannot be empty"));
        }
        if name.len() > 64 {
            return Err(ApiError::bad_request("Skill name is too long"));
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    state
        .db
        .profiles()
        .replace_skills(auth.user_id, &names)
        .await
        .db_err("Failed to update skills")?;

    let skills = state
        .db
        .profiles()
        .list_skills(auth.user_id)
        .await
        .db_err("Failed to list skills")?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "skills": skills }))))
}

#[derive(Deserialize)]
struct ExperienceEntry {
    uuid: Option<String>,
    title: String,
    company: String,
    start_date: String,
    end_date: Option<String>,
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct ReplaceExperiencesRequest {
    experiences: Vec<ExperienceEntry>,
}

const MAX_EXPERIENCES: usize = 50;

async fn replace_experiences(
    State(state): State<ProfilesState>,
    ApiAuth(auth): ApiAuth,
    Json(payload): Json<ReplaceExperiencesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.experiences.len() > MAX_EXPERIENCES {
        return Err(ApiError::bad_request("Too many experiences"));
    }

    let mut items = Vec::with_capacity(payload.experiences.len());
    for entry in payload.experiences {
        let title = entry.title.trim();
        let company = entry.company.trim();
        if title.is_empty() || company.is_empty() {
            return Err(ApiError::bad_request("Title and company are required"));
        }
        if title.len() > 120 || company.len() > 120 {
            return Err(ApiError::bad_request("Title or company is too long"));
        }
        if entry.start_date.trim().is_empty() {
            return Err(ApiError::bad_request("Start date is required"));
        }
        if entry.summary.len() > 2000 {
            return Err(ApiError::bad_request("Summary is too long"));
        }

        items.push(ExperienceInput {
            uuid: entry.uuid,
            title: title.to_string(),
            company: company.to_string(),
            start_date: entry.start_date.trim().to_string(),
            end_date: entry.end_date.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            summary: entry.summary.trim().to_string(),
        });
    }

    state
        .db
        .profiles()
        .replace_experiences(auth.user_id, &items)
        .await
        .db_err("Failed to update experiences")?;

    let experiences = state
        .db
        .profiles()
        .list_experiences(auth.user_id)
        .await
        .db_err("Failed to list experiences")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "experiences": experiences })),
    ))
}
