//! The read-parse-execute-report loop
//!
//! The shell owns the single client of the process. It is either logged out
//! (no client) or logged in; only a handful of commands work while logged
//! out. After every command that talks to the service the session is checked,
//! and one silent re-login is attempted if the service dropped it.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::client::http::check_address;
use crate::app::client::Transport;
use crate::app::validator::{self, parse_seconds};
use crate::app::{parse_line, ClientConfig, CommandInvocation, Outcome, StarexecClient, Status};
use crate::auth::Credentials;
use crate::cli::commands::{self, Reporter};
use crate::constants::{auth, commands as names, params};
use crate::errors::{AppError, Result, TransportError, ValidationError};

/// Command reference printed by `help`
pub const HELP_TEXT: &str = "\
starcom - command-line client for StarExec

Parameters are given as key=value; a key with no value (key=) is a flag.
Lists of ids are comma separated.

General
  login u= p= [addr=]      log in (u=guest for the public account)
  logout                   end the session
  exit                     log out and quit
  sleep t=                 wait t seconds
  runfile f= [verbose=]    run the commands in a file
  returnids / ignoreids    print or hide the ids of created primitives

Downloads (id= out= [ow=])
  getjobout getjobinfo getspacexml getspace getspacehierarchy getpostproc
  getbenchproc getbench getsolver getjobpair
  getnewjobinfo getnewjobout [since=]
  polljob id= out= t=      fetch new job results every t seconds until done

Uploads
  pushsolver id= (f=|url=) [n=] [d=|df=] [downloadable=]
  pushbenchmarks id= bt= (f=|url=) [dep=] [link=] [hier=] [downloadable=] [allperm=]
  pushpostproc pushbenchproc id= f= [n=] [d=]
  pushspacexml id= f=
  pushconfig id= f= [n=] [d=]

Jobs and spaces
  createjob id= qid= [pid=] [n=] [d=] [w=] [cpu=] [trav=d|r]
  createsubspace id= [n=] [d=] [lock=] [allperm=]
  pausejob resumejob id=
  setspacepublic setspaceprivate id= [hier=]

Listing (id= [limit=], or u= for your own solvers, benchmarks and jobs)
  ls lssolvers lsbenchmarks lsjobs lsusers lssubspaces

Copy, link, remove and delete
  copysolver linksolver copybench linkbench copyspace linkjob linkuser id= [from=] to= [hier=]
  removesolver removebench removeuser removejob id= from=
  removesubspace id= [deleteprims=]
  deletesolver deletebench deletepostproc deletebenchproc deleteconfig deletejob id=

Account
  setfirstname setlastname setinstitution setarchivetype val=";

/// How the shell reaches the service when a user logs in
#[derive(Debug, Clone)]
pub enum Connector {
    /// Build an HTTP transport per login
    Http(ClientConfig),
    /// Reuse one transport for every login
    Fixed(Arc<dyn Transport>),
}

impl Connector {
    fn connect(&self, base_url: Url, credentials: Credentials) -> Result<StarexecClient> {
        match self {
            Connector::Http(config) => StarexecClient::with_config(config, base_url, credentials),
            Connector::Fixed(transport) => {
                check_address(&base_url)?;
                Ok(StarexecClient::new(transport.clone(), base_url, credentials))
            }
        }
    }
}

/// Settings of one shell
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub prompt: String,
    /// Address used when `login` has no `addr=`
    pub base_url: Url,
    /// Draw spinners during transfers
    pub progress: bool,
}

/// Interactive and batch command loop over one output sink
pub struct Shell<W: Write> {
    options: ShellOptions,
    connector: Connector,
    client: Option<StarexecClient>,
    out: W,
    print_ids: bool,
}

impl<W: Write> Shell<W> {
    pub fn new(options: ShellOptions, connector: Connector, out: W) -> Self {
        Self {
            options,
            connector,
            client: None,
            out,
            print_ids: true,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.is_some()
    }

    pub fn client(&self) -> Option<&StarexecClient> {
        self.client.as_ref()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Log in without going through the command parser
    pub async fn login_with(&mut self, credentials: Credentials, base_url: Option<Url>) -> Outcome {
        if self.client.is_some() {
            return Status::ConnectionExists.into();
        }
        let base_url = base_url.unwrap_or_else(|| self.options.base_url.clone());
        let result = match self.connector.connect(base_url, credentials) {
            Ok(mut client) => client.login().await.map(|()| client),
            Err(e) => Err(e),
        };

        match result {
            Ok(client) => {
                info!("Logged in to {}", client.base_url());
                self.client = Some(client);
                Status::LoginOk.into()
            }
            Err(e) => {
                warn!("Login failed: {}", e);
                Outcome::from_error(&e)
            }
        }
    }

    /// Run commands from `input` until `exit`, end of input or a lost connection
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<Status> {
        let mut lines = input.lines();
        loop {
            write!(self.out, "{}", self.options.prompt)?;
            self.out.flush()?;

            let line = match lines.next_line().await? {
                Some(line) => line,
                None => {
                    self.write_line("");
                    let outcome = self.exit().await;
                    self.print(&outcome);
                    return Ok(outcome.status);
                }
            };

            let outcome = self.execute_line(&line).await;
            self.print(&outcome);
            match outcome.status {
                Status::Exit => return Ok(Status::Exit),
                Status::ConnectionLost => {
                    error!("Session could not be restored, terminating");
                    return Ok(Status::ConnectionLost);
                }
                _ => {}
            }
        }
    }

    /// Execute one raw input line and return its outcome without printing it
    pub async fn execute_line(&mut self, line: &str) -> Outcome {
        match parse_line(line) {
            Ok(Some(cmd)) => self.execute(&cmd).await,
            Ok(None) => Outcome::ok(),
            Err(e) => Outcome::from_error(&e.into()),
        }
    }

    fn execute_line_boxed<'a>(
        &'a mut self,
        line: &'a str,
    ) -> Pin<Box<dyn Future<Output = Outcome> + 'a>> {
        Box::pin(self.execute_line(line))
    }

    async fn execute(&mut self, cmd: &CommandInvocation) -> Outcome {
        match cmd.name() {
            names::EXIT => return self.exit().await,
            names::HELP => {
                return Outcome::ok().with_report(HELP_TEXT.lines().map(str::to_string).collect())
            }
            names::SLEEP => return self.sleep(cmd).await.unwrap_or_else(|e| Outcome::from_error(&e)),
            names::LOGIN => return self.login(cmd).await,
            names::RUN_FILE => {
                return self.run_file_command(cmd).await.unwrap_or_else(|e| Outcome::from_error(&e))
            }
            _ => {}
        }

        let Some(client) = self.client.as_mut() else {
            return Status::NotLoggedIn.into();
        };

        match cmd.name() {
            names::LOGOUT => {
                client.logout().await;
                self.client = None;
                return Status::LogoutOk.into();
            }
            names::RETURN_IDS | names::IGNORE_IDS => {
                self.print_ids = cmd.name() == names::RETURN_IDS;
                return Outcome::ok();
            }
            _ => {}
        }

        let outcome = {
            let mut reporter = Reporter::new(&mut self.out, self.options.progress);
            match commands::dispatch(client, cmd, &mut reporter).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    debug!("{} failed ({}): {}", cmd.name(), e.category(), e);
                    Outcome::from_error(&e)
                }
            }
        };

        if outcome.status == Status::ConnectionLost {
            warn!("{} could not restore the session", cmd.name());
            self.client = None;
            return outcome;
        }

        if !client.is_valid() {
            info!("Session lost, logging in again");
            if let Err(e) = client.relogin().await {
                warn!("Could not restore the session: {}", e);
                self.client = None;
                return Status::ConnectionLost.into();
            }
        }
        outcome
    }

    /// Log out if logged in; always ends with `Exit`
    pub async fn exit(&mut self) -> Outcome {
        if let Some(mut client) = self.client.take() {
            if !client.logout().await {
                debug!("Logout on exit did not reach the service");
            }
        }
        Status::Exit.into()
    }

    async fn sleep(&mut self, cmd: &CommandInvocation) -> Result<Outcome> {
        let ignored = validator::validate_sleep(cmd)?;
        let seconds = cmd.require(params::INTERVAL)?;
        let duration = Duration::try_from_secs_f64(parse_seconds(seconds)?).map_err(|_| {
            ValidationError::InvalidTime {
                value: seconds.to_string(),
            }
        })?;
        tokio::time::sleep(duration).await;
        Ok(Outcome::ok().with_ignored(ignored))
    }

    async fn login(&mut self, cmd: &CommandInvocation) -> Outcome {
        if self.client.is_some() {
            return Status::ConnectionExists.into();
        }
        let ignored = match validator::validate_login(cmd) {
            Ok(ignored) => ignored,
            Err(e) => return Outcome::from_error(&e.into()),
        };

        let base_url = match cmd.get(params::ADDRESS) {
            Some(address) => match Url::parse(address) {
                Ok(url) => Some(url),
                Err(e) => {
                    let error = AppError::from(TransportError::InvalidAddress {
                        url: address.to_string(),
                        reason: e.to_string(),
                    });
                    return Outcome::from_error(&error);
                }
            },
            None => None,
        };

        let user = cmd.get(params::USER).unwrap_or(auth::GUEST_USERNAME);
        let credentials = Credentials::new(user, cmd.get(params::PASSWORD).unwrap_or_default());
        self.login_with(credentials, base_url)
            .await
            .with_ignored(ignored)
    }

    async fn run_file_command(&mut self, cmd: &CommandInvocation) -> Result<Outcome> {
        let ignored = validator::validate_run_file(cmd)?;
        let path = cmd.require(params::FILE)?.to_string();
        let status = self.run_file(Path::new(&path), cmd.has(params::VERBOSE)).await;
        Ok(Outcome::new(status).with_ignored(ignored))
    }

    /// Run each line of a command file in turn.
    ///
    /// Stops at `exit` or when the connection is lost. With `verbose` each
    /// command and its full outcome are printed; otherwise only the lines a
    /// command reports, such as listings and created ids.
    pub async fn run_file(&mut self, path: &Path, verbose: bool) -> Status {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read command file {}: {}", path.display(), e);
                return Status::CommandFileTerminating;
            }
        };
        info!("Running commands from {}", path.display());

        for line in content.lines() {
            if verbose {
                self.write_line(&format!("Processing Command: {line}"));
            }
            let outcome = self.execute_line_boxed(line).await;
            if verbose {
                self.print(&outcome);
            } else {
                self.print_results(&outcome);
            }

            match outcome.status {
                Status::Exit => return Status::Ok,
                Status::ConnectionLost | Status::CommandFileTerminating => {
                    return Status::CommandFileTerminating
                }
                _ => {}
            }
        }
        Status::Ok
    }

    /// Print the full outcome: results, warnings and the status line
    pub fn print(&mut self, outcome: &Outcome) {
        self.print_ids(outcome);
        for line in outcome.render() {
            self.write_line(&line);
        }
    }

    fn print_results(&mut self, outcome: &Outcome) {
        self.print_ids(outcome);
        for line in outcome.report.clone() {
            self.write_line(&line);
        }
    }

    fn print_ids(&mut self, outcome: &Outcome) {
        if !self.print_ids {
            return;
        }
        for id in &outcome.created_ids {
            let line = format!("id={id}");
            self.write_line(&line);
        }
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            debug!("Could not write to output: {}", e);
        }
    }
}
