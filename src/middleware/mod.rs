use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{request::Parts, StatusCode},
};

use crate::error::ServiceError;

// Обертки над экстракторами axum: ошибка разбора тела, query или пути
// отдается как VALIDATION_ERROR, а не текстовым ответом axum.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct AppQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServiceError))]
pub struct AppPath<T>(pub T);

/// Заголовок с id пользователя, который проставляет шлюз после аутентификации.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

// Проверка учетных данных живет во внешнем шлюзе, здесь только идентичность
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or(StatusCode::UNAUTHORIZED)?;
        Ok(AuthUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::response::IntoResponse;
    use serde::Deserialize;

    use crate::scheduling::CreateScreening;

    async fn error_body(err: ServiceError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/screenings")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let bad_time = r#"{"movieId":1,"theaterId":1,"roomId":10,"date":"2024-06-01","time":"9h15","price":10.0}"#;
        let missing_movie = r#"{"theaterId":1,"roomId":10,"date":"2024-06-01","time":"09:15","price":10.0}"#;
        for body in [bad_time, missing_movie, "{not json"] {
            let err = AppJson::<CreateScreening>::from_request(json_request(body), &())
                .await
                .err()
                .unwrap();
            assert!(matches!(err, ServiceError::Validation(_)));
            let (status, json) = error_body(err).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["success"], false);
            assert_eq!(json["code"], "VALIDATION_ERROR");
        }

        let ok = r#"{"movieId":1,"theaterId":1,"roomId":10,"date":"2024-06-01","time":"09:15","price":10.0}"#;
        let AppJson(req) = AppJson::<CreateScreening>::from_request(json_request(ok), &())
            .await
            .unwrap();
        assert_eq!(req.room_id, 10);
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct SlotsParams {
        #[allow(dead_code)]
        room_id: i64,
    }

    #[tokio::test]
    async fn malformed_query_is_a_validation_error() {
        let (mut parts, _) = Request::builder()
            .uri("/api/screenings/available-slots?roomId=ten")
            .body(())
            .unwrap()
            .into_parts();
        let err = AppQuery::<SlotsParams>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        let (status, json) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    async fn extract(value: Option<&str>) -> Result<AuthUser, StatusCode> {
        let mut builder = Request::builder().uri("/api/bookings");
        if let Some(v) = value {
            builder = builder.header(USER_ID_HEADER, v);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn user_id_header_is_required() {
        assert_eq!(extract(Some("42")).await, Ok(AuthUser { user_id: 42 }));
        assert_eq!(extract(None).await, Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract(Some("abc")).await, Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract(Some("-3")).await, Err(StatusCode::UNAUTHORIZED));
    }
}
