// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Renderers for the trace document.

use std::fmt::Write;

use console::style;

use crate::diagnose::OutcomeKind;
use crate::error::{Error, ErrorKind};
use crate::model::TraceResult;

/// Render the trace as the JSON document that forms the stable contract.
pub fn render_json(result: &TraceResult) -> Result<String, Error> {
    serde_json::to_string_pretty(result)
        .map_err(|error| ErrorKind::Msg(format!("json rendering failed: {error}")).into())
}

/// Render the trace for humans: one line per step, a summary line, and the
/// hint list.
pub fn render_pretty(result: &TraceResult) -> String {
    let mut lines = vec![style("dnswhy").bold().magenta().to_string(), String::new()];

    for step in &result.steps {
        let status = if step.error.is_empty() {
            style("OK").bold().green().to_string()
        } else {
            style("FAIL").bold().red().to_string()
        };
        let server = if step.server_name.is_empty() {
            step.server.clone()
        } else {
            format!("{} ({})", step.server, step.server_name)
        };

        let mut line = if step.error.is_empty() {
            format!(
                "{status} {:02} {server} {} {} -> {}",
                step.index + 1,
                step.query_name,
                step.query_type,
                step.rcode
            )
        } else {
            format!(
                "{status} {:02} {server} {} {} -> error: {}",
                step.index + 1,
                step.query_name,
                step.query_type,
                step.error
            )
        };
        if step.authoritative {
            line.push_str(" aa");
        }
        if !step.rtt.is_empty() {
            let _ = write!(line, " rtt={}", step.rtt);
        }
        if !step.answers.is_empty() {
            let answers: Vec<String> = step.answers.iter().map(|a| normalize_space(a)).collect();
            let _ = write!(line, " answers={}", answers.join(" | "));
        }
        if !step.note.is_empty() {
            let _ = write!(line, " note={}", step.note);
        }
        lines.push(line);
    }

    lines.push(String::new());
    let summary = format!(
        "{} {}",
        result.diagnosis.classification, result.diagnosis.summary
    );
    if result.diagnosis.classification == OutcomeKind::Success {
        lines.push(style(summary).bold().green().to_string());
    } else {
        lines.push(style(summary).bold().red().to_string());
    }
    if !result.diagnosis.hints.is_empty() {
        lines.push("Hints:".to_string());
        for hint in &result.diagnosis.hints {
            lines.push(format!("- {hint}"));
        }
    }

    lines.join("\n")
}

fn normalize_space(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnose::{diagnose, Outcome};
    use crate::model::{TraceStep, Timing};

    fn sample(kind: OutcomeKind, hints: Vec<String>) -> TraceResult {
        let step = TraceStep {
            index: 0,
            server: "198.41.0.4:53".to_string(),
            server_name: "a.root-servers.net".to_string(),
            query_name: "example.com.".to_string(),
            query_type: "A".to_string(),
            transport: "udp".to_string(),
            rcode: "NOERROR".to_string(),
            authoritative: true,
            answers: vec!["example.com.   60  IN  A   203.0.113.10".to_string()],
            rtt: "9.1ms".to_string(),
            note: "responses=1 ok=1 timeout=0 error=0".to_string(),
            ..TraceStep::default()
        };
        TraceResult {
            timings: vec![Timing {
                step_index: 0,
                server: step.server.clone(),
                rtt: step.rtt.clone(),
                timed_out: false,
                transport: "udp".to_string(),
            }],
            steps: vec![step],
            diagnosis: diagnose(Outcome {
                kind,
                summary: "summary line".to_string(),
                evidence_step: Some(0),
                hints,
            }),
        }
    }

    #[test]
    fn pretty_renders_steps_and_summary() {
        let rendered = render_pretty(&sample(OutcomeKind::Success, Vec::new()));
        assert!(rendered.contains("OK 01 198.41.0.4:53 (a.root-servers.net) example.com. A -> NOERROR"));
        assert!(rendered.contains(" aa"));
        assert!(rendered.contains("rtt=9.1ms"));
        assert!(rendered.contains("answers=example.com. 60 IN A 203.0.113.10"));
        assert!(rendered.contains("note=responses=1 ok=1"));
        assert!(rendered.contains("SUCCESS summary line"));
        assert!(!rendered.contains("Hints:"));
    }

    #[test]
    fn pretty_renders_hints_and_errors() {
        let mut result = sample(
            OutcomeKind::ServfailTimeout,
            vec!["retry with --transport tcp".to_string()],
        );
        result.steps[0].error = "request timed out".to_string();
        result.steps[0].rcode = String::new();
        result.steps[0].answers.clear();

        let rendered = render_pretty(&result);
        assert!(rendered.contains("FAIL 01"));
        assert!(rendered.contains("error: request timed out"));
        assert!(rendered.contains("SERVFAIL_TIMEOUT summary line"));
        assert!(rendered.contains("Hints:\n- retry with --transport tcp"));
    }

    #[test]
    fn json_is_valid_and_round_trips() {
        let result = sample(OutcomeKind::Success, Vec::new());
        let rendered = render_json(&result).unwrap();
        let decoded: TraceResult = serde_json::from_str(&rendered).unwrap();
        assert_eq!(result, decoded);
    }
}
