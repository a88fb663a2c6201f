//! Strict deterministic fallback over an ordered provider list.
//!
//! The first provider whose process exits zero with output carrying the
//! expected leading magic wins; providers after it are never invoked.
//! This is priority fallback, not a best-candidate search.

use kiln_core::artifact::{ArtifactFormat, CompiledArtifact};
use kiln_core::{KilnError, KilnResult};

use crate::process::{first_line, ProcessRunner};
use crate::provider::CompilationProvider;

pub fn resolve(
    runner: &dyn ProcessRunner,
    providers: &[CompilationProvider],
    source: &[u8],
    format: ArtifactFormat,
) -> KilnResult<CompiledArtifact> {
    if providers.is_empty() {
        return Err(KilnError::Configuration(format!(
            "no {} compilation providers configured",
            format.name()
        )));
    }

    let mut attempts = Vec::with_capacity(providers.len());
    for provider in providers {
        let input = provider.accepts_stdin.then_some(source);
        let output = match runner.execute(&provider.command, &provider.args, input) {
            Ok(output) => output,
            Err(err) => {
                // A command that cannot even spawn is one more failed
                // attempt; the next provider may still be runnable.
                tracing::warn!(provider = %provider.label, error = %err, "provider spawn failed");
                attempts.push(format!("{}: {err}", provider.label));
                continue;
            }
        };

        if output.exit_code == 0 && format.accepts(&output.stdout) {
            tracing::info!(
                provider = %provider.label,
                bytes = output.stdout.len(),
                format = format.name(),
                "compilation provider accepted"
            );
            return Ok(CompiledArtifact::new(output.stdout, provider.label.clone()));
        }

        let reason = first_line(&output.stderr);
        let reason = if reason.is_empty() {
            format!("exit_code={}", output.exit_code)
        } else {
            reason.to_string()
        };
        tracing::debug!(provider = %provider.label, %reason, "compilation provider rejected");
        attempts.push(format!("{}: {reason}", provider.label));
    }

    Err(KilnError::Provider { attempts })
}
