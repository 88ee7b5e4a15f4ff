//! Terminal output for the command-line client.

use eyeinsight_core::auth::{Session, SessionStatus};
use eyeinsight_core::models::{ScanRecord, ScanStatus, User};
use eyeinsight_core::utils::truncate_string;
use eyeinsight_core::validation::ValidationErrors;
use eyeinsight_core::{GuardDecision, Route};

/// Width of the prediction column in the report table
const PREDICTION_WIDTH: usize = 32;

pub fn banner(message: &str) {
    eprintln!("\n  ! {}\n", message);
}

pub fn validation_errors(errors: &ValidationErrors) {
    for error in &errors.errors {
        eprintln!("  {}: {}", error.field, error.message);
    }
}

pub fn signed_in(user: &User) {
    println!("Welcome, {} <{}>", user.username, user.email);
}

pub fn navigated(route: &Route) {
    println!("-> {}", route);
}

pub fn already_signed_in(session: &Session, to: &Route) {
    if let Some(user) = session.user() {
        println!("Already signed in as {}. Run `eyeinsight logout` first.", user.username);
    }
    navigated(to);
}

pub fn redirected(from: &Route, to: &Route) {
    eprintln!("{} requires sign-in, redirected to {}", from, to);
}

pub fn session(session: &Session) {
    match &session.status {
        SessionStatus::Authenticated(user) => {
            println!("Signed in as {} <{}>", user.username, user.email);
            println!("  id:   {}", user.id);
            if user.is_admin() {
                println!("  role: {} (administrator)", user.role);
            } else {
                println!("  role: {}", user.role);
            }
        }
        SessionStatus::Failed(reason) => println!("Not signed in (last attempt: {})", reason),
        SessionStatus::Idle | SessionStatus::Validating => println!("Checking session..."),
        SessionStatus::Anonymous => println!("Not signed in"),
    }
}

pub fn decision(route: &Route, decision: &GuardDecision, current: &Route) {
    match decision {
        GuardDecision::Render => println!("{}: render", route),
        GuardDecision::Loading => println!("{}: loading", route),
        GuardDecision::Redirect { to, replace } => println!(
            "{}: redirect to {}{} (now at {})",
            route,
            to,
            if *replace { " (replace)" } else { "" },
            current
        ),
    }
}

fn status_marker(status: ScanStatus) -> &'static str {
    match status {
        ScanStatus::Normal => " ",
        ScanStatus::Warning => "~",
        ScanStatus::Alert => "!",
    }
}

pub fn scan_table(scans: &[&ScanRecord], total: usize) {
    if scans.is_empty() {
        if total == 0 {
            println!("No scans yet. Upload one with `eyeinsight upload <image>`.");
        } else {
            println!("No reports match your search ({} total).", total);
        }
        return;
    }

    println!(
        "  {:<8} {:<20} {:<w$} {:>6}",
        "ID",
        "DATE",
        "PREDICTION",
        "CONF",
        w = PREDICTION_WIDTH
    );
    for scan in scans {
        println!(
            "{} {:<8} {:<20} {:<w$} {:>5}%",
            status_marker(scan.status()),
            truncate_string(&scan.id, 8),
            scan.date_display(),
            truncate_string(&scan.diagnosis_label(), PREDICTION_WIDTH),
            scan.confidence_percent(),
            w = PREDICTION_WIDTH
        );
    }
    println!("\n{} of {} reports", scans.len(), total);
}

pub fn scan_detail(scan: &ScanRecord) {
    println!("\n=== Scan {} ===", scan.id);
    println!("Date:       {}", scan.date_display());
    println!("Diagnosis:  {}", scan.diagnosis_label());
    println!("Confidence: {}%", scan.confidence_percent());
    println!("Status:     {}", scan.status());
    if let Some(path) = scan.imagepath.as_deref() {
        println!("Image:      {}", path);
    }
    if scan.status() != ScanStatus::Normal {
        println!("\nPlease consult an eye care professional about this result.");
    }
}
