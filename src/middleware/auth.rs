use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Claims minted by the external auth collaborator. `sub` carries the
/// caller's id (a student id for student tokens).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

pub const STAFF_ROLES: [&str; 2] = ["staff", "admin"];

impl Claims {
    pub fn is_staff(&self) -> bool {
        let role = self.role.as_deref().unwrap_or_default();
        STAFF_ROLES.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn caller_id(&self) -> crate::error::Result<Uuid> {
        self.sub
            .parse()
            .map_err(|_| crate::error::Error::Unauthorized("Malformed subject claim".to_string()))
    }

    /// Students act only on their own records; staff may act on anyone's.
    pub fn ensure_owns(&self, student_id: Uuid) -> crate::error::Result<()> {
        if self.is_staff() || self.caller_id()? == student_id {
            Ok(())
        } else {
            Err(crate::error::Error::Forbidden(
                "Cannot act on another student's participant record".to_string(),
            ))
        }
    }
}

fn decode_bearer(req: &Request) -> Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization"})),
        )
            .into_response());
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"bad_authorization"})),
        )
            .into_response());
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"unsupported_scheme"})),
        )
            .into_response());
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims),
        Err(_) => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_token"})),
        )
            .into_response()),
    }
}

/// Any authenticated caller: the student participation surface. Handlers
/// enforce per-record ownership themselves.
pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    match decode_bearer(&req) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

/// Staff control surface: session lifecycle, kick, monitoring.
pub async fn require_staff(mut req: Request, next: Next) -> Response {
    match decode_bearer(&req) {
        Ok(claims) => {
            if !claims.is_staff() {
                return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"}))).into_response();
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Option<&str>, sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: 4_000_000_000,
            role: role.map(|r| r.to_string()),
        }
    }

    #[test]
    fn staff_roles_are_case_insensitive() {
        assert!(claims(Some("Staff"), "x").is_staff());
        assert!(claims(Some("ADMIN"), "x").is_staff());
        assert!(!claims(Some("student"), "x").is_staff());
        assert!(!claims(None, "x").is_staff());
    }

    #[test]
    fn ownership_check() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();

        let student = claims(Some("student"), &id.to_string());
        assert!(student.ensure_owns(id).is_ok());
        assert!(student.ensure_owns(other).is_err());

        let staff = claims(Some("staff"), &Uuid::new_v4().to_string());
        assert!(staff.ensure_owns(other).is_ok());
    }
}
