/// Profile and notification preferences of the signed-in therapist
///
/// # Endpoints
///
/// - `GET /v1/user/profile`, `PUT /v1/user/profile`
/// - `GET /v1/user/notification-settings`, `PUT /v1/user/notification-settings`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use tipul_shared::{
    auth::middleware::AuthContext,
    models::{
        normalize_optional,
        notification_setting::{
            NotificationChannel, NotificationSetting, UpsertNotificationSetting,
            DEFAULT_DEBT_THRESHOLD_DAYS, DEFAULT_EVENING_TIME, DEFAULT_MORNING_TIME,
        },
        user::{UpdateProfile, User},
    },
    scheduling::parse_hhmm,
};

/// Profile update; absent fields are left alone, blank ones are cleared
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub license: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationSettingsRequest {
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub morning_time: Option<String>,
    pub evening_time: Option<String>,
    pub debt_threshold_days: Option<i32>,
    pub monthly_reminder_day: Option<i32>,
}

impl NotificationSettingsRequest {
    fn validated_time(value: Option<String>, field: &str, default: &str) -> ApiResult<String> {
        match value {
            None => Ok(default.to_string()),
            Some(v) if parse_hhmm(&v).is_some() => Ok(v),
            Some(_) => Err(ApiError::invalid(field, "Time must be HH:MM")),
        }
    }

    /// Checks the shared fields and builds one upsert per channel
    fn into_upserts(self) -> ApiResult<[UpsertNotificationSetting; 2]> {
        let morning_time =
            Self::validated_time(self.morning_time, "morning_time", DEFAULT_MORNING_TIME)?;
        let evening_time =
            Self::validated_time(self.evening_time, "evening_time", DEFAULT_EVENING_TIME)?;

        let debt_threshold_days = self.debt_threshold_days.unwrap_or(DEFAULT_DEBT_THRESHOLD_DAYS);
        if debt_threshold_days < 1 {
            return Err(ApiError::invalid(
                "debt_threshold_days",
                "Threshold must be at least one day",
            ));
        }

        if let Some(day) = self.monthly_reminder_day {
            if !(1..=31).contains(&day) {
                return Err(ApiError::invalid(
                    "monthly_reminder_day",
                    "Day must be between 1 and 31",
                ));
            }
        }

        let row = |channel, enabled| UpsertNotificationSetting {
            channel,
            enabled,
            morning_time: morning_time.clone(),
            evening_time: evening_time.clone(),
            debt_threshold_days,
            monthly_reminder_day: self.monthly_reminder_day,
        };

        Ok([
            row(NotificationChannel::Email, self.email_enabled),
            row(NotificationChannel::Push, self.push_enabled),
        ])
    }
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let name = match req.name {
        Some(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ApiError::invalid("name", "Name is required"));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let update = UpdateProfile {
        name,
        phone: req.phone.map(|v| normalize_optional(Some(v))),
        license: req.license.map(|v| normalize_optional(Some(v))),
        image: req.image.map(|v| normalize_optional(Some(v))),
    };

    let user = if update.is_empty() {
        User::find_by_id(&state.db, auth.user_id).await?
    } else {
        User::update_profile(&state.db, auth.user_id, update).await?
    }
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

pub async fn get_notification_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<NotificationSetting>>> {
    let settings = NotificationSetting::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(settings))
}

/// Replaces both channel rows and returns them
pub async fn update_notification_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<NotificationSettingsRequest>,
) -> ApiResult<Json<Vec<NotificationSetting>>> {
    let mut saved = Vec::with_capacity(2);
    for upsert in req.into_upserts()? {
        saved.push(NotificationSetting::upsert(&state.db, auth.user_id, upsert).await?);
    }

    tracing::debug!(user_id = %auth.user_id, "Notification settings updated");

    Ok(Json(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NotificationSettingsRequest {
        NotificationSettingsRequest {
            email_enabled: true,
            push_enabled: false,
            morning_time: None,
            evening_time: Some("21:30".to_string()),
            debt_threshold_days: None,
            monthly_reminder_day: Some(10),
        }
    }

    #[test]
    fn test_settings_defaults_and_channels() {
        let [email, push] = request().into_upserts().unwrap();

        assert_eq!(email.channel, NotificationChannel::Email);
        assert!(email.enabled);
        assert_eq!(push.channel, NotificationChannel::Push);
        assert!(!push.enabled);

        assert_eq!(email.morning_time, DEFAULT_MORNING_TIME);
        assert_eq!(push.evening_time, "21:30");
        assert_eq!(push.debt_threshold_days, DEFAULT_DEBT_THRESHOLD_DAYS);
        assert_eq!(push.monthly_reminder_day, Some(10));
    }

    #[test]
    fn test_settings_rejects_bad_values() {
        let bad_time = NotificationSettingsRequest {
            morning_time: Some("8am".to_string()),
            ..request()
        };
        assert!(matches!(bad_time.into_upserts(), Err(ApiError::ValidationError(_))));

        let bad_day = NotificationSettingsRequest {
            monthly_reminder_day: Some(32),
            ..request()
        };
        assert!(bad_day.into_upserts().is_err());

        let bad_threshold = NotificationSettingsRequest {
            debt_threshold_days: Some(0),
            ..request()
        };
        assert!(bad_threshold.into_upserts().is_err());
    }
}
