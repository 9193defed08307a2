//! Single-flight bearer renewal for protected HTTP APIs: attach short-lived credentials, renew
//! them once per expiry, and replay every request that was waiting on the renewal.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cell;
pub mod classify;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod renewal;
pub mod session;
pub mod terminate;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		cell::{CredentialCell, MemoryCell},
		config::SessionConfig,
		http::ReqwestTransport,
		session::SessionClient,
		terminate::{LoginRedirect, SessionTerminator},
	};

	/// Session client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestSession = SessionClient<ReqwestTransport>;

	/// Handles returned by [`build_reqwest_test_session`] so tests can inspect shared state.
	pub struct TestSessionParts {
		/// Session client under test.
		pub session: ReqwestTestSession,
		/// Credential cell shared with the session.
		pub cell: Arc<MemoryCell>,
		/// Terminator shared with the session.
		pub terminator: Arc<LoginRedirect>,
	}

	/// Builds a session config rooted at a mock server's base URL.
	pub fn test_session_config(base_url: &str) -> SessionConfig {
		let origin = Url::parse(base_url).expect("Mock server base URL should parse.");

		SessionConfig::builder(origin).build().expect("Default session config should validate.")
	}

	/// Constructs a [`SessionClient`] backed by an in-memory cell, a recording
	/// [`LoginRedirect`] terminator, and the reqwest transport.
	pub fn build_reqwest_test_session(config: SessionConfig) -> TestSessionParts {
		let cell_backend = Arc::new(MemoryCell::default());
		let cell: Arc<dyn CredentialCell> = cell_backend.clone();
		let terminator_backend = Arc::new(LoginRedirect::new(&config.login_route));
		let terminator: Arc<dyn SessionTerminator> = terminator_backend.clone();
		let session =
			SessionClient::with_transport(config, ReqwestTransport::default(), cell, terminator);

		TestSessionParts { session, cell: cell_backend, terminator: terminator_backend }
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http::{HeaderMap, Method, StatusCode, header};
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
