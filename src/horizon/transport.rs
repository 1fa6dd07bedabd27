use crate::core::errors::LedgerError;
use crate::core::kernel::{EventStream, RestClient};
use crate::core::traits::{EventSource, LedgerQuery, TxSubmitter};
use crate::core::types::TxResponse;
use crate::horizon::converters::convert_submit_response;
use crate::horizon::types::{HorizonProblem, HorizonSubmitResponse};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument, warn};

/// `LedgerTransport` implementation backed by a Horizon server
pub struct HorizonTransport<R: RestClient> {
    pub rest: R,
}

impl<R: RestClient> HorizonTransport<R> {
    pub const fn new(rest: R) -> Self {
        Self { rest }
    }
}

/// Turn a failed submission into the most specific error available.
///
/// Horizon reports rejected transactions as problem documents carrying
/// `extras.result_codes`; anything else is left as the transport error.
pub fn map_submit_error(err: LedgerError) -> LedgerError {
    let parsed = match &err {
        LedgerError::ApiError { code, message } => serde_json::from_str::<HorizonProblem>(message)
            .ok()
            .map(|problem| (*code, problem)),
        _ => None,
    };
    let Some((code, problem)) = parsed else {
        return err;
    };
    let Some(result_codes) = problem.extras.and_then(|extras| extras.result_codes) else {
        return err;
    };

    let status = if problem.status == 0 {
        u16::try_from(code).unwrap_or_default()
    } else {
        problem.status
    };
    LedgerError::LedgerRejected {
        status,
        title: problem.title,
        detail: problem.detail,
        result_codes: Some(result_codes),
    }
}

#[async_trait]
impl<R: RestClient> TxSubmitter for HorizonTransport<R> {
    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    async fn submit(&self, payload: &str) -> Result<TxResponse, LedgerError> {
        let value = self
            .rest
            .post_form("/transactions", &[("tx", payload)])
            .await
            .map_err(|e| {
                let mapped = map_submit_error(e);
                warn!(error = %mapped.summary(), "Transaction submission failed");
                mapped
            })?;

        let response: HorizonSubmitResponse = serde_json::from_value(value)?;
        info!(hash = %response.hash, ledger = ?response.ledger, "Transaction accepted");
        Ok(convert_submit_response(response))
    }
}

#[async_trait]
impl<R: RestClient> LedgerQuery for HorizonTransport<R> {
    async fn query(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, LedgerError> {
        self.rest.get(path, params).await
    }

    async fn query_text(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<String, LedgerError> {
        self.rest.get_text(path, params).await
    }
}

#[async_trait]
impl<R: RestClient> EventSource for HorizonTransport<R> {
    async fn stream(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<EventStream, LedgerError> {
        self.rest.stream(path, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_with_result_codes_becomes_rejection() {
        let err = LedgerError::ApiError {
            code: 400,
            message: r#"{"type":"transaction_failed","title":"Transaction Failed","status":400,
                "detail":"see extras","extras":{"result_codes":
                {"transaction":"tx_failed","operations":["op_underfunded"]}}}"#
                .to_string(),
        };
        let mapped = map_submit_error(err);
        assert_eq!(mapped.summary(), "400: Transaction Failed (tx_failed, op_underfunded)");
        assert_eq!(
            mapped.result_codes().unwrap().operations,
            vec!["op_underfunded".to_string()]
        );
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = LedgerError::ApiError {
            code: 504,
            message: "gateway timeout".to_string(),
        };
        assert_eq!(map_submit_error(err.clone()), err);

        let problem_without_codes = LedgerError::ApiError {
            code: 404,
            message: r#"{"title":"Resource Missing","status":404}"#.to_string(),
        };
        assert_eq!(
            map_submit_error(problem_without_codes.clone()),
            problem_without_codes
        );

        let network = LedgerError::NetworkError("refused".to_string());
        assert_eq!(map_submit_error(network.clone()), network);
    }
}
