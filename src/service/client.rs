//! Fetching custodians from the simulator, locally or over HTTP.

use crate::core::custodian::{Custodian, CustodianId};
use crate::simulation::store::LedgerStore;
use log::warn;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },
    #[error("cannot decode custodian from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    #[error("custodian {0} not found")]
    NotFound(CustodianId),
}

/// Anything that can hand out full custodian records by ID.
///
/// Either every requested custodian is returned, in request order, or the
/// whole batch fails.
pub trait CustodianSource {
    fn fetch_custodians(
        &self,
        ids: &[CustodianId],
        deadline: Duration,
    ) -> Result<Vec<Custodian>, FetchError>;
}

impl<T: CustodianSource + ?Sized> CustodianSource for &T {
    fn fetch_custodians(
        &self,
        ids: &[CustodianId],
        deadline: Duration,
    ) -> Result<Vec<Custodian>, FetchError> {
        (**self).fetch_custodians(ids, deadline)
    }
}

/// Blocking HTTP client for the simulator's custodian endpoint.
///
/// Issues one `GET {base_url}{id}` per custodian, one after another.
#[derive(Debug, Clone)]
pub struct CustodianClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl CustodianClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, id: CustodianId) -> String {
        format!("{}{}", self.base_url, id)
    }

    fn fetch_one(&self, id: CustodianId, timeout: Duration) -> Result<Custodian, FetchError> {
        let url = self.url_for(id);
        let response = match self.http.get(&url).timeout(timeout).send() {
            Ok(response) => response,
            Err(source) => {
                warn!("fetching custodian {} failed: {}", id, source);
                return Err(FetchError::Request { url, source });
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!("fetching custodian {} returned {}", id, status);
            return Err(FetchError::Status { url, status });
        }
        response
            .json::<Custodian>()
            .map_err(|source| FetchError::Decode { url, source })
    }
}

impl CustodianSource for CustodianClient {
    fn fetch_custodians(
        &self,
        ids: &[CustodianId],
        deadline: Duration,
    ) -> Result<Vec<Custodian>, FetchError> {
        let started = Instant::now();
        let mut custodians = Vec::with_capacity(ids.len());
        for &id in ids {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(FetchError::DeadlineExceeded(deadline));
            }
            custodians.push(self.fetch_one(id, remaining)?);
        }
        Ok(custodians)
    }
}

/// In-process access, used when the tracker runs next to the store.
impl CustodianSource for LedgerStore {
    fn fetch_custodians(
        &self,
        ids: &[CustodianId],
        _deadline: Duration,
    ) -> Result<Vec<Custodian>, FetchError> {
        ids.iter()
            .map(|&id| self.get_custodian(id).ok_or(FetchError::NotFound(id)))
            .collect()
    }
}
