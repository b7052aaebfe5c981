use serde::{Deserialize, Serialize};

use super::error::ProtocolError;

/// Error body carried by a failed [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code of the failure.
    pub code: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outer wrapper of every response body. Holds exactly one of `data` or `error`.
///
/// Fields are private so that the only ways to obtain an `Envelope` are the checked
/// constructors below and deserialization, which runs the same check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawEnvelope<D, L, M>",
    bound(
        serialize = "D: Serialize, L: Serialize, M: Serialize",
        deserialize = "D: Deserialize<'de>, L: Deserialize<'de>, M: Deserialize<'de>"
    )
)]
pub struct Envelope<D, L = serde_json::Value, M = serde_json::Value> {
    data: Option<D>,
    error: Option<ApiError>,
    links: Option<L>,
    meta: Option<M>,
}

#[derive(Deserialize)]
struct RawEnvelope<D, L, M> {
    data: Option<D>,
    error: Option<ApiError>,
    links: Option<L>,
    meta: Option<M>,
}

impl<D, L, M> TryFrom<RawEnvelope<D, L, M>> for Envelope<D, L, M> {
    type Error = ProtocolError;

    // A JSON `null` payload already arrives here as `None`.
    fn try_from(raw: RawEnvelope<D, L, M>) -> Result<Self, Self::Error> {
        Envelope::checked(raw.data, raw.error, raw.links, raw.meta)
    }
}

/// Rejects a payload that would go on the wire as `"data": null`.
fn ensure_non_null<D: Serialize>(data: &D) -> Result<(), ProtocolError> {
    let value = serde_json::to_value(data)
        .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
    if value.is_null() {
        return Err(ProtocolError::InvariantViolation(
            "data must not serialize to null",
        ));
    }
    Ok(())
}

impl<D: Serialize, L, M> Envelope<D, L, M> {
    pub fn new(
        data: Option<D>,
        error: Option<ApiError>,
        links: Option<L>,
        meta: Option<M>,
    ) -> Result<Self, ProtocolError> {
        if let Some(data) = &data {
            ensure_non_null(data)?;
        }
        Self::checked(data, error, links, meta)
    }

    pub fn success(data: D) -> Result<Self, ProtocolError> {
        ensure_non_null(&data)?;
        Ok(Self {
            data: Some(data),
            error: None,
            links: None,
            meta: None,
        })
    }
}

impl<D, L, M> Envelope<D, L, M> {
    fn checked(
        data: Option<D>,
        error: Option<ApiError>,
        links: Option<L>,
        meta: Option<M>,
    ) -> Result<Self, ProtocolError> {
        match (&data, &error) {
            (Some(_), Some(_)) => Err(ProtocolError::InvariantViolation(
                "must not provide both data and error",
            )),
            (None, None) => Err(ProtocolError::InvariantViolation(
                "must provide data or error",
            )),
            _ => Ok(Self {
                data,
                error,
                links,
                meta,
            }),
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            data: None,
            error: Some(error),
            links: None,
            meta: None,
        }
    }

    pub fn with_links(mut self, links: L) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_meta(mut self, meta: M) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn links(&self) -> Option<&L> {
        self.links.as_ref()
    }

    pub fn meta(&self) -> Option<&M> {
        self.meta.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some()
    }

    /// Unwrap into the payload or the error; exactly one is always present.
    pub fn into_result(self) -> Result<D, ApiError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => unreachable!("envelope constructed without data or error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    type Body = Envelope<Value>;

    fn sample_error() -> ApiError {
        ApiError::new(401, "Session revoked")
    }

    #[test]
    fn test_data_only_is_accepted() {
        for links in [None, Some(json!({"self": "/x"}))] {
            for meta in [None, Some(json!({"count": 1}))] {
                let envelope =
                    Body::new(Some(json!({"a": 1})), None, links.clone(), meta.clone()).unwrap();
                assert!(envelope.is_success());
                assert_eq!(envelope.links(), links.as_ref());
                assert_eq!(envelope.meta(), meta.as_ref());
            }
        }
    }

    #[test]
    fn test_error_only_is_accepted() {
        for links in [None, Some(json!({}))] {
            for meta in [None, Some(json!({}))] {
                let envelope =
                    Body::new(None, Some(sample_error()), links.clone(), meta.clone()).unwrap();
                assert!(!envelope.is_success());
                assert_eq!(envelope.error(), Some(&sample_error()));
            }
        }
    }

    #[test]
    fn test_both_present_is_rejected() {
        for links in [None, Some(json!({}))] {
            for meta in [None, Some(json!({}))] {
                let result = Body::new(Some(json!(1)), Some(sample_error()), links.clone(), meta);
                assert_eq!(
                    result.unwrap_err(),
                    ProtocolError::InvariantViolation("must not provide both data and error")
                );
            }
        }
    }

    #[test]
    fn test_neither_present_is_rejected() {
        for links in [None, Some(json!({}))] {
            for meta in [None, Some(json!({}))] {
                let result = Body::new(None, None, links.clone(), meta);
                assert_eq!(
                    result.unwrap_err(),
                    ProtocolError::InvariantViolation("must provide data or error")
                );
            }
        }
    }

    #[test]
    fn test_deserialization_enforces_exclusivity() {
        let both = r#"{"data": 1, "error": {"code": 500, "message": "x"}}"#;
        assert!(serde_json::from_str::<Envelope<i32>>(both).is_err());

        let neither = r#"{"data": null, "error": null, "links": null, "meta": null}"#;
        assert!(serde_json::from_str::<Envelope<i32>>(neither).is_err());

        let ok: Envelope<i32> = serde_json::from_str(r#"{"data": 7}"#).unwrap();
        assert_eq!(ok.into_result(), Ok(7));
    }

    #[test]
    fn test_null_payload_is_rejected() {
        let violation = ProtocolError::InvariantViolation("data must not serialize to null");

        assert_eq!(Envelope::<()>::success(()).unwrap_err(), violation);
        assert_eq!(Envelope::<Value>::success(Value::Null).unwrap_err(), violation);
        assert_eq!(Envelope::<Option<i32>>::success(None).unwrap_err(), violation);
        assert_eq!(
            Envelope::<Option<i32>>::new(Some(None), None, None, None).unwrap_err(),
            violation
        );

        assert!(Envelope::<Option<i32>>::success(Some(0)).is_ok());
        assert!(Envelope::<Value>::success(json!({})).is_ok());
    }

    #[test]
    fn test_constructed_envelopes_survive_the_wire() {
        let bodies: Vec<Body> = vec![
            Body::success(json!([1, 2])).unwrap(),
            Body::success(json!(false)).unwrap(),
            Body::success(json!("")).unwrap(),
            Body::success(json!({"a": null}))
                .unwrap()
                .with_links(json!({"self": "/a"}))
                .with_meta(json!({"count": 0})),
            Body::new(Some(json!(0)), None, None, Some(json!({}))).unwrap(),
            Body::failure(sample_error()),
            Body::failure(sample_error()).with_meta(json!({"request": 1})),
        ];

        for envelope in bodies {
            let wire = serde_json::to_string(&envelope).unwrap();
            let decoded: Body = serde_json::from_str(&wire).unwrap();
            assert_eq!(decoded, envelope);
        }

        let failure: Envelope<()> = Envelope::failure(sample_error());
        let wire = serde_json::to_string(&failure).unwrap();
        let decoded: Envelope<()> = serde_json::from_str(&wire).unwrap();
        assert_eq!(decoded, failure);
    }

    #[test]
    fn test_failure_serializes_null_data() {
        let envelope: Envelope<i32> = Envelope::failure(sample_error());
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "data": null,
                "error": {"code": 401, "message": "Session revoked"},
                "links": null,
                "meta": null
            })
        );
    }
}
