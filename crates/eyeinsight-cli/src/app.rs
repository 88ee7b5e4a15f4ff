//! Application state for the EyeInsight command-line client.
//!
//! `App` is the application root: it owns the session store and the
//! navigator, and hands the store's token to the scan endpoints.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use eyeinsight_core::api::ScanUpload;
use eyeinsight_core::auth::TokenStore;
use eyeinsight_core::models::{ScanFilter, ScanRecord, User};
use eyeinsight_core::validation::{self, LoginForm, SignupForm};
use eyeinsight_core::{ApiClient, Config, GuardDecision, Navigator, Route, SessionStore};

use crate::render;

/// Environment variable supplying the login email
const EMAIL_ENV: &str = "EYEINSIGHT_EMAIL";

/// Environment variable supplying the login password
const PASSWORD_ENV: &str = "EYEINSIGHT_PASSWORD";

pub type Store = SessionStore<ApiClient, Box<dyn TokenStore>>;

pub struct App {
    pub config: Config,
    pub store: Store,
    pub navigator: Navigator,
}

impl App {
    /// Create the application root and run the startup session check.
    pub async fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let base_url = config.api_base_url();
        debug!(base_url = %base_url, backend = ?config.token_backend, "Config loaded");

        let api = ApiClient::new(&base_url).context("Failed to build HTTP client")?;
        let tokens = config.token_store()?;
        let store = SessionStore::new(api, tokens);

        store.validate_startup().await;
        info!(status = ?store.status(), "Startup session check finished");

        Ok(Self {
            config,
            store,
            navigator: Navigator::default(),
        })
    }

    /// Route a protected surface through the guard. Returns an API client
    /// carrying the session token when the route may render.
    fn enter(&mut self, route: Route) -> Result<ApiClient> {
        let decision = self.navigator.open(route.clone(), &self.store.status());
        match decision {
            GuardDecision::Render => {
                let token = self
                    .store
                    .token()
                    .ok_or_else(|| anyhow::anyhow!("Session has no token"))?;
                Ok(self.store.api().with_token(token))
            }
            GuardDecision::Loading => Err(anyhow::anyhow!("Session check still in progress")),
            GuardDecision::Redirect { to, .. } => {
                render::redirected(&route, &to);
                Err(anyhow::anyhow!("Not signed in. Run `eyeinsight login` first."))
            }
        }
    }

    /// Apply whatever navigation the latest session transition implies
    fn follow_session(&mut self) {
        let session = self.store.session();
        if let Some(route) = self.navigator.on_session(&session) {
            render::navigated(&route);
        }
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Open a login or signup page. Returns false when the session is
    /// already signed in and the page redirected away.
    fn enter_auth_page(&mut self, route: Route) -> bool {
        match self.navigator.open(route, &self.store.status()) {
            GuardDecision::Redirect { to, .. } => {
                render::already_signed_in(&self.store.session(), &to);
                false
            }
            GuardDecision::Render | GuardDecision::Loading => true,
        }
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        if !self.enter_auth_page(Route::Login) {
            return Ok(());
        }
        let email = match email.or_else(|| std::env::var(EMAIL_ENV).ok()) {
            Some(email) => email,
            None => prompt_with_default("Email", self.config.last_email.as_deref())?,
        };
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) => password,
            Err(_) => rpassword::prompt_password("Password: ")?,
        };

        let form = LoginForm::new(&email, &password);
        if let Err(errors) = form.validate() {
            render::validation_errors(&errors);
            anyhow::bail!("Login form is invalid");
        }

        println!("Signing in...");
        match self.store.login(email.trim(), &password).await {
            Ok(user) => {
                self.remember_email(&user);
                render::signed_in(&user);
                self.follow_session();
                Ok(())
            }
            Err(e) => {
                render::banner(&e.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn signup(&mut self) -> Result<()> {
        if !self.enter_auth_page(Route::Signup) {
            return Ok(());
        }
        println!("\n=== Create an EyeInsight account ===\n");
        let form = SignupForm {
            username: prompt("Username")?,
            email: prompt("Email")?,
            password: rpassword::prompt_password("Password: ")?,
            confirm_password: rpassword::prompt_password("Confirm password: ")?,
            age: prompt("Age (optional)")?,
            gender: prompt("Gender (optional)")?,
        };

        let profile = match form.validate() {
            Ok(profile) => profile,
            Err(errors) => {
                render::validation_errors(&errors);
                anyhow::bail!("Signup form is invalid");
            }
        };

        println!("Creating account...");
        match self.store.signup(&profile).await {
            Ok(user) => {
                self.remember_email(&user);
                render::signed_in(&user);
                self.follow_session();
                Ok(())
            }
            Err(e) => {
                render::banner(&e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn logout(&mut self) {
        self.store.logout();
        println!("Signed out.");
        self.follow_session();
    }

    pub fn whoami(&self, json: bool) -> Result<()> {
        let session = self.store.session();
        if json {
            let value = serde_json::json!({
                "status": session.status,
                "event": session.event,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            render::session(&session);
        }
        Ok(())
    }

    fn remember_email(&mut self, user: &User) {
        self.config.last_email = Some(user.email.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    // =========================================================================
    // Scans
    // =========================================================================

    pub async fn reports(&mut self, search: &str, filter: ScanFilter) -> Result<()> {
        let api = self.enter(Route::Reports)?;
        let scans = api.fetch_scans().await.context("Failed to load reports")?;
        let shown: Vec<&ScanRecord> = filter.apply(&scans, search);
        render::scan_table(&shown, scans.len());
        Ok(())
    }

    pub async fn result(&mut self, id: &str) -> Result<()> {
        let api = self.enter(Route::Result(id.to_string()))?;
        let scan = api
            .fetch_scan(id)
            .await
            .context("Failed to load prediction results")?;
        render::scan_detail(&scan);
        Ok(())
    }

    pub async fn upload(&mut self, path: &Path) -> Result<()> {
        let api = self.enter(Route::Upload)?;

        let size = std::fs::metadata(path)
            .with_context(|| format!("Cannot read {}", path.display()))?
            .len();
        let mime_type = match validation::validate_upload(path, size) {
            Ok(mime) => mime,
            Err(errors) => {
                render::validation_errors(&errors);
                anyhow::bail!("File rejected");
            }
        };

        let bytes = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scan".to_string());

        println!("Uploading {} ({} bytes)...", file_name, size);
        let scan = api
            .upload_scan(ScanUpload {
                file_name,
                mime_type: mime_type.to_string(),
                bytes,
            })
            .await
            .map_err(|e| {
                render::banner(
                    e.server_message()
                        .unwrap_or("Failed to upload image. Please try again."),
                );
                anyhow::Error::new(e)
            })?;

        info!(scan_id = %scan.id, "Scan uploaded");
        let route = Route::Result(scan.id.clone());
        self.navigator.push(route.clone());
        render::navigated(&route);
        render::scan_detail(&scan);
        Ok(())
    }

    /// Show what the guard decides for an arbitrary path
    pub fn open(&mut self, path: &str) {
        let route = Route::parse(path);
        let decision = self.navigator.open(route.clone(), &self.store.status());
        render::decision(&route, &decision, self.navigator.current());
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => {
            print!("{} [{}]: ", label, default);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            let input = input.trim();
            if input.is_empty() {
                Ok(default.to_string())
            } else {
                Ok(input.to_string())
            }
        }
        None => prompt(label),
    }
}
