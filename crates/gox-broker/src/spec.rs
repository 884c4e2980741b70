//! Ingress/egress specifier grammar (spec §4.2).

use gox_types::ids::{PipeName, Topic};

/// One parsed ingress/egress specifier. Agents may declare several
/// comma-separated specifiers on ingress to merge multiple inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
	/// `sub:<topic>` — subscribe to a topic.
	Subscribe(Topic),
	/// `pub:<topic>` — publish to a topic.
	Publish(Topic),
	/// `pipe:<name>` — open a named pipe; direction inferred from role.
	Pipe(PipeName),
	/// `file:<glob>` — file-ingestion sentinel, interpreted by the agent's
	/// own file-ingestion handler; opaque to the broker.
	File(String),
}

/// Parses a comma-separated ingress/egress specifier string.
///
/// # Errors
/// Returns the offending substring if it matches none of the recognised
/// forms (`sub:`, `pub:`, `pipe:`, `file:`).
pub fn parse_specifiers(spec: &str) -> Result<Vec<Specifier>, String> {
	spec.split(',').map(str::trim).filter(|s| !s.is_empty()).map(parse_one).collect()
}

fn parse_one(token: &str) -> Result<Specifier, String> {
	if let Some(rest) = token.strip_prefix("sub:") {
		return Ok(Specifier::Subscribe(Topic::new(rest)));
	}
	if let Some(rest) = token.strip_prefix("pub:") {
		return Ok(Specifier::Publish(Topic::new(rest)));
	}
	if let Some(rest) = token.strip_prefix("pipe:") {
		return Ok(Specifier::Pipe(PipeName::new(rest)));
	}
	if let Some(rest) = token.strip_prefix("file:") {
		return Ok(Specifier::File(rest.to_string()));
	}
	Err(format!("unrecognised ingress/egress specifier: {token}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_each_form() {
		assert_eq!(parse_one("sub:raw").unwrap(), Specifier::Subscribe(Topic::new("raw")));
		assert_eq!(parse_one("pub:raw").unwrap(), Specifier::Publish(Topic::new("raw")));
		assert_eq!(parse_one("pipe:out").unwrap(), Specifier::Pipe(PipeName::new("out")));
		assert_eq!(
			parse_one("file:./in/*.txt").unwrap(),
			Specifier::File("./in/*.txt".to_string())
		);
	}

	#[test]
	fn comma_separated_merges_inputs() {
		let specs = parse_specifiers("sub:raw, pipe:side").unwrap();
		assert_eq!(specs.len(), 2);
	}

	#[test]
	fn unrecognised_form_is_rejected() {
		assert!(parse_one("bogus:thing").is_err());
	}
}
