// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! JUnit XML reader
//!
//! Reads the de-facto JUnit schema written by pytest, nextest, surefire and
//! friends: a `<testsuites>` or `<testsuite>` root, nested suites, and one
//! `<testcase>` per test with optional `<failure>`, `<error>` or `<skipped>`
//! children. Any structural problem turns into a [`ParseWarning`] with no
//! cases; parsing never fails hard.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

use super::model::{ParseOutcome, TestCaseResult, TestOutcome};

/// Parse a JUnit report file
pub fn parse(path: &Path) -> ParseOutcome {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ParseOutcome::warn(path, "report file missing");
        }
        Err(e) => return ParseOutcome::warn(path, format!("report unreadable: {}", e)),
    };

    match parse_str(&content) {
        Ok(cases) => ParseOutcome {
            cases,
            warning: None,
        },
        Err(reason) => ParseOutcome::warn(path, reason),
    }
}

struct SuiteFrame {
    declared: Option<usize>,
    cases: usize,
}

struct CaseBuilder {
    name: String,
    outcome: TestOutcome,
    message: Option<String>,
    /// Set while inside a marker element without a `message` attribute
    collect_text: bool,
}

impl CaseBuilder {
    fn from_element(e: &BytesStart) -> Result<Self, String> {
        let name = attr(e, b"name")?.ok_or("testcase without a name attribute")?;
        let name = match attr(e, b"classname")? {
            Some(class) if !class.is_empty() => format!("{}::{}", class, name),
            _ => name,
        };

        Ok(Self {
            name,
            outcome: TestOutcome::Passed,
            message: None,
            collect_text: false,
        })
    }

    /// Apply a `<failure>`, `<error>` or `<skipped>` marker
    fn mark(&mut self, e: &BytesStart, has_body: bool) -> Result<(), String> {
        let outcome = match e.name().as_ref() {
            b"failure" | b"error" => TestOutcome::Failed,
            b"skipped" => TestOutcome::Skipped,
            _ => return Ok(()),
        };

        // failure wins over skipped when both appear
        if self.outcome == TestOutcome::Failed && outcome == TestOutcome::Skipped {
            return Ok(());
        }

        self.outcome = outcome;
        self.message = attr(e, b"message")?.filter(|m| !m.is_empty());
        self.collect_text = has_body && self.message.is_none();
        Ok(())
    }

    fn finish(self) -> TestCaseResult {
        TestCaseResult {
            name: self.name,
            outcome: self.outcome,
            message: self.message,
        }
    }
}

fn attr(e: &BytesStart, key: &[u8]) -> Result<Option<String>, String> {
    for a in e.attributes() {
        let a = a.map_err(|e| e.to_string())?;
        if a.key.as_ref() == key {
            let value = a.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn declared_tests(e: &BytesStart) -> Result<Option<usize>, String> {
    match attr(e, b"tests")? {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("non-numeric tests attribute '{}'", raw)),
        None => Ok(None),
    }
}

/// Parse JUnit XML text into test cases, in document order
pub fn parse_str(xml: &str) -> Result<Vec<TestCaseResult>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut cases = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut suites: Vec<SuiteFrame> = Vec::new();
    let mut current: Option<CaseBuilder> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed XML at byte {}: {}", reader.buffer_position(), e))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();

                if !seen_root {
                    if !matches!(name.as_ref(), b"testsuites" | b"testsuite") {
                        return Err(format!(
                            "unexpected root element <{}>",
                            String::from_utf8_lossy(name.as_ref())
                        ));
                    }
                    seen_root = true;
                } else if depth == 0 {
                    return Err("multiple root elements".to_string());
                }

                match name.as_ref() {
                    b"testsuite" => {
                        if current.is_some() {
                            return Err("testsuite nested inside a testcase".to_string());
                        }
                        let frame = SuiteFrame {
                            declared: declared_tests(e)?,
                            cases: 0,
                        };
                        if is_empty {
                            close_suite(frame, &mut suites)?;
                        } else {
                            suites.push(frame);
                        }
                    }
                    b"testcase" => {
                        if current.is_some() {
                            return Err("testcase nested inside a testcase".to_string());
                        }
                        let builder = CaseBuilder::from_element(e)?;
                        if is_empty {
                            close_case(builder, &mut cases, &mut suites);
                        } else {
                            current = Some(builder);
                        }
                    }
                    _ => {
                        if let Some(ref mut case) = current {
                            case.mark(e, !is_empty)?;
                        }
                    }
                }

                if !is_empty {
                    depth += 1;
                }
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);

                match e.name().as_ref() {
                    b"testsuite" => {
                        let frame = suites.pop().ok_or("unbalanced </testsuite>")?;
                        close_suite(frame, &mut suites)?;
                    }
                    b"testcase" => {
                        let builder = current.take().ok_or("unbalanced </testcase>")?;
                        close_case(builder, &mut cases, &mut suites);
                    }
                    _ => {
                        if let Some(ref mut case) = current {
                            case.collect_text = false;
                        }
                    }
                }
            }
            Event::Text(ref t) => {
                if let Some(ref mut case) = current {
                    if case.collect_text {
                        let text = t.unescape().map_err(|e| e.to_string())?;
                        append_message(case, text.trim());
                    }
                }
            }
            Event::CData(ref t) => {
                if let Some(ref mut case) = current {
                    if case.collect_text {
                        let text = String::from_utf8_lossy(t).into_owned();
                        append_message(case, text.trim());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err("empty document".to_string());
    }
    if depth != 0 || current.is_some() || !suites.is_empty() {
        return Err("unexpected end of document".to_string());
    }

    Ok(cases)
}

fn append_message(case: &mut CaseBuilder, text: &str) {
    if text.is_empty() {
        return;
    }
    match case.message {
        Some(ref mut message) => {
            message.push('\n');
            message.push_str(text);
        }
        None => case.message = Some(text.to_string()),
    }
}

fn close_case(builder: CaseBuilder, cases: &mut Vec<TestCaseResult>, suites: &mut [SuiteFrame]) {
    if let Some(suite) = suites.last_mut() {
        suite.cases += 1;
    }
    cases.push(builder.finish());
}

fn close_suite(frame: SuiteFrame, suites: &mut [SuiteFrame]) -> Result<(), String> {
    if let Some(declared) = frame.declared {
        if declared != frame.cases {
            return Err(format!(
                "testsuite declares {} tests but contains {}",
                declared, frame.cases
            ));
        }
    }
    // Nested suites count towards their parent
    if let Some(parent) = suites.last_mut() {
        parent.cases += frame.cases;
    }
    Ok(())
}
