/// Request extractors mapping malformed input onto the error taxonomy
use crate::{
    error::ApiError,
    pagination::{Pagination, PaginationQuery},
};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::{Validate, ValidationErrors};

/// JSON body that has been deserialized and validated
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::InvalidJson)?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::EmptyRequestBody);
        }

        let value: T = serde_json::from_slice(&body).map_err(|e| {
            tracing::debug!("Rejected request body: {}", e);
            ApiError::InvalidJson
        })?;

        value
            .validate()
            .map_err(|errors| ApiError::Validation(validation_messages(&errors)))?;

        Ok(ValidatedJson(value))
    }
}

/// One human-readable line per failed field rule, sorted by field
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: failed '{}' rule", field, err.code),
            })
        })
        .collect();
    messages.sort();
    messages
}

/// Deserialize a field that distinguishes "absent" from `null`.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent stays `None`, `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Pagination parsed from `limit`, `after_id` and `after_date`
#[derive(Debug, Clone)]
pub struct Page(pub Pagination);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Page {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PaginationQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::FailedToParseQueryParams)?;

        Pagination::from_query(&query).map(Page)
    }
}

#[derive(Debug, Default, Deserialize)]
struct TargetQuery {
    list_id: Option<String>,
    heading_id: Option<String>,
}

async fn target_query<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<TargetQuery, ApiError> {
    Query::<TargetQuery>::from_request_parts(parts, state)
        .await
        .map(|Query(query)| query)
        .map_err(|_| ApiError::FailedToParseQueryParams)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Required `?list_id=`
#[derive(Debug, Clone)]
pub struct ListIdQuery(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ListIdQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = target_query(parts, state).await?;
        non_empty(query.list_id)
            .map(ListIdQuery)
            .ok_or(ApiError::EmptyQueryListId)
    }
}

/// Required `?heading_id=`
#[derive(Debug, Clone)]
pub struct HeadingIdQuery(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for HeadingIdQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = target_query(parts, state).await?;
        non_empty(query.heading_id)
            .map(HeadingIdQuery)
            .ok_or(ApiError::EmptyQueryHeadingId)
    }
}

/// Optional `?heading_id=` accompanying a list move
#[derive(Debug, Clone)]
pub struct OptionalHeadingIdQuery(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OptionalHeadingIdQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = target_query(parts, state).await?;
        Ok(OptionalHeadingIdQuery(non_empty(query.heading_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest};

    #[derive(Debug, Deserialize, Validate)]
    struct Titled {
        #[validate(length(min = 1, max = 8))]
        title: String,
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    async fn extract(body: &str) -> Result<ValidatedJson<Titled>, ApiError> {
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        ValidatedJson::<Titled>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn test_empty_body() {
        assert!(matches!(extract("").await, Err(ApiError::EmptyRequestBody)));
        assert!(matches!(extract("  \n").await, Err(ApiError::EmptyRequestBody)));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        assert!(matches!(extract("{title:").await, Err(ApiError::InvalidJson)));
        assert!(matches!(extract(r#"{"note": null}"#).await, Err(ApiError::InvalidJson)));
    }

    #[tokio::test]
    async fn test_validation_failure_lists_fields() {
        match extract(r#"{"title": ""}"#).await {
            Err(ApiError::Validation(messages)) => {
                assert_eq!(messages.len(), 1);
                assert!(messages[0].starts_with("title:"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|v| v.0)),
        }
    }

    #[tokio::test]
    async fn test_nullable_distinguishes_absent_from_null() {
        let ValidatedJson(absent) = extract(r#"{"title": "a"}"#).await.unwrap();
        assert_eq!(absent.note, None);

        let ValidatedJson(null) = extract(r#"{"title": "a", "note": null}"#).await.unwrap();
        assert_eq!(null.note, Some(None));

        let ValidatedJson(set) = extract(r#"{"title": "a", "note": "x"}"#).await.unwrap();
        assert_eq!(set.note, Some(Some("x".to_string())));
    }

    #[tokio::test]
    async fn test_missing_list_id_query() {
        let req = HttpRequest::builder().uri("/move?list_id=").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        assert!(matches!(
            ListIdQuery::from_request_parts(&mut parts, &()).await,
            Err(ApiError::EmptyQueryListId)
        ));
    }

    #[tokio::test]
    async fn test_page_query() {
        let req = HttpRequest::builder()
            .uri("/user/tasks?limit=5&after_id=abc")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let Page(page) = Page::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(page.limit, 5);
        assert_eq!(page.after_id.as_deref(), Some("abc"));

        let req = HttpRequest::builder()
            .uri("/user/tasks/upcoming?after_date=15-01-2025")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        assert!(matches!(
            Page::from_request_parts(&mut parts, &()).await,
            Err(ApiError::FailedToParseQueryParams)
        ));
    }
}
