//! Hooks that let an authority deployment decorate token requests and sort its error
//! responses into the broker taxonomy.

// self
use crate::{_prelude::*, provider::descriptor::GrantType};

/// Authority-specific behavior consulted by every grant.
///
/// Hooks only see crate-owned data so implementations never depend on the HTTP client.
pub trait ProviderStrategy: Send + Sync {
	/// Sorts a failed token response into a [`ProviderErrorKind`].
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds extra form fields (for example `resource` or `audience`) before dispatch.
	fn augment_token_request(&self, _grant: GrantType, _form: &mut BTreeMap<String, String>) {}
}

/// Error categories a strategy can assign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The refresh token or subject token was rejected.
	InvalidGrant,
	/// The client id or secret was rejected.
	InvalidClient,
	/// The client may not obtain the requested scopes.
	InsufficientScope,
	/// Temporary failure; retry later.
	Transient,
}

/// Plain description of a failed token response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant that failed.
	pub grant_type: GrantType,
	/// HTTP status, when the authority answered.
	pub http_status: Option<u16>,
	/// OAuth `error` code.
	pub oauth_error: Option<String>,
	/// OAuth `error_description`.
	pub error_description: Option<String>,
	/// Truncated body for responses that were not OAuth JSON.
	pub body_preview: Option<String>,
	/// Set when the request never reached the authority.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Empty context for `grant_type`.
	pub fn new(grant_type: GrantType) -> Self {
		Self {
			grant_type,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Context describing a transport failure.
	pub fn network_failure(grant_type: GrantType) -> Self {
		Self { network_error: true, ..Self::new(grant_type) }
	}

	/// Sets the HTTP status.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Sets the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Sets the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Sets the body preview, truncated to 256 characters.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		let body = body.into();
		let preview = match body.char_indices().nth(Self::BODY_PREVIEW_LIMIT) {
			Some((cut, _)) => format!("{}…", &body[..cut]),
			None => body,
		};

		self.body_preview = Some(preview);

		self
	}

	/// Human-readable reason used in broker errors.
	pub fn reason(&self) -> String {
		match (&self.oauth_error, &self.error_description) {
			(Some(code), Some(description)) => format!("{code}: {description}"),
			(Some(code), None) => code.clone(),
			(None, Some(description)) => description.clone(),
			(None, None) => match (&self.body_preview, self.http_status) {
				(Some(body), _) if !body.is_empty() => body.clone(),
				(_, Some(status)) => format!("HTTP {status}"),
				_ => "no response".into(),
			},
		}
	}
}

/// Strategy tuned for OpenIddict-style authorities.
///
/// Structured OAuth codes win, then body hints, then the HTTP status. Transport failures
/// are always transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		ctx.oauth_error
			.as_deref()
			.and_then(classify_code)
			.or_else(|| ctx.error_description.as_deref().and_then(classify_text))
			.or_else(|| ctx.body_preview.as_deref().and_then(classify_text))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_code(code: &str) -> Option<ProviderErrorKind> {
	const KINDS: [(&str, ProviderErrorKind); 9] = [
		("invalid_grant", ProviderErrorKind::InvalidGrant),
		("invalid_request", ProviderErrorKind::InvalidGrant),
		("access_denied", ProviderErrorKind::InvalidGrant),
		("invalid_client", ProviderErrorKind::InvalidClient),
		("unauthorized_client", ProviderErrorKind::InvalidClient),
		("invalid_scope", ProviderErrorKind::InsufficientScope),
		("insufficient_scope", ProviderErrorKind::InsufficientScope),
		("temporarily_unavailable", ProviderErrorKind::Transient),
		("server_error", ProviderErrorKind::Transient),
	];

	KINDS.iter().find(|(known, _)| code.eq_ignore_ascii_case(known)).map(|(_, kind)| *kind)
}

fn classify_text(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	if lowered.contains("invalid_grant") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if lowered.contains("invalid_client") {
		Some(ProviderErrorKind::InvalidClient)
	} else if lowered.contains("invalid_scope") || lowered.contains("insufficient_scope") {
		Some(ProviderErrorKind::InsufficientScope)
	} else if lowered.contains("temporarily_unavailable") {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn classify(ctx: ProviderErrorContext) -> ProviderErrorKind {
		DefaultProviderStrategy.classify_token_error(&ctx)
	}

	#[test]
	fn oauth_codes_take_precedence_over_status() {
		let ctx = ProviderErrorContext::new(GrantType::TokenExchange)
			.with_http_status(500)
			.with_oauth_error("invalid_grant");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidGrant);

		let ctx = ProviderErrorContext::new(GrantType::ClientCredentials)
			.with_http_status(400)
			.with_oauth_error("unauthorized_client");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidClient);
	}

	#[test]
	fn falls_back_to_body_then_status() {
		let ctx = ProviderErrorContext::new(GrantType::RefreshToken)
			.with_http_status(502)
			.with_body_preview("upstream said INVALID_SCOPE");

		assert_eq!(classify(ctx), ProviderErrorKind::InsufficientScope);

		let status_only = |status: u16| {
			classify(ProviderErrorContext::new(GrantType::RefreshToken).with_http_status(status))
		};

		assert_eq!(status_only(400), ProviderErrorKind::InvalidGrant);
		assert_eq!(status_only(401), ProviderErrorKind::InvalidClient);
		assert_eq!(status_only(403), ProviderErrorKind::InsufficientScope);
		assert_eq!(status_only(429), ProviderErrorKind::Transient);
		assert_eq!(status_only(503), ProviderErrorKind::Transient);
		assert_eq!(
			classify(ProviderErrorContext::network_failure(GrantType::RefreshToken)),
			ProviderErrorKind::Transient
		);
	}

	#[test]
	fn preview_is_truncated_and_reason_prefers_oauth_fields() {
		let ctx =
			ProviderErrorContext::new(GrantType::RefreshToken).with_body_preview("x".repeat(300));

		assert_eq!(ctx.body_preview.as_deref().map(|body| body.chars().count()), Some(257));
		assert_eq!(
			ProviderErrorContext::new(GrantType::RefreshToken)
				.with_oauth_error("invalid_grant")
				.with_error_description("refresh token revoked")
				.reason(),
			"invalid_grant: refresh token revoked"
		);
		assert_eq!(
			ProviderErrorContext::new(GrantType::RefreshToken).with_http_status(502).reason(),
			"HTTP 502"
		);
	}
}
