//! Git smart HTTP proxying.
//!
//! Serves `info/refs` advertisements and stateless RPC POSTs by spawning
//! the git binary against the authorized repository and streaming its
//! output back to the client. Every route is wrapped by the access gate
//! before any subprocess work begins.

use crate::error::GitError;
use crate::pktline::{scan_deepen, PktLine};
use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Router};
use futures::TryStreamExt;
use packhorse_auth::{AccessGate, ActorClass, Authorization, GateDecision};
use packhorse_exec::{copy_counted, Subprocess};
use packhorse_metrics::METRICS;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::process::ChildStdout;
use tokio_util::io::{ReaderStream, StreamReader};

/// Environment variable carrying the authorized actor id to git hooks.
pub const ACTOR_ID_ENV: &str = "PACKHORSE_ID";

/// Bytes of the request body inspected for a shallow-clone `deepen` line.
const SNIFF_WINDOW: usize = 4096;

/// Capacity of the in-memory pipe between the git subprocess and the
/// response body.
const STREAM_BUFFER: usize = 64 * 1024;

/// Shared state for the git proxy routes.
#[derive(Clone)]
pub struct GitHttpState {
    /// Access gate consulted before any git work.
    pub gate: Arc<dyn AccessGate>,
    /// Path to the git binary.
    pub git_binary: PathBuf,
    /// Environment passed to every git subprocess.
    pub base_env: HashMap<String, String>,
}

/// Creates the git smart HTTP router.
pub fn router(state: GitHttpState) -> Router {
    Router::new()
        // Captures span whole path segments, so `repo` matches the
        // `<name>.git` component as one piece.
        .route("/{owner}/{repo}/info/refs", get(get_info_refs))
        .route("/{owner}/{repo}/{action}", post(post_rpc))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            pre_authorize,
        ))
        .with_state(state)
}

/// Consults the access gate and checks the authorized repository before
/// any handler runs. Denials pass through untouched.
async fn pre_authorize(
    State(state): State<GitHttpState>,
    request: Request,
    next: Next,
) -> Result<Response, GitError> {
    let (parts, body) = request.into_parts();

    let auth = match state.gate.authorize(&parts, "").await? {
        GateDecision::Allow(auth) => auth,
        GateDecision::Deny(response) => return Ok(response),
    };

    if auth.repo_path.is_empty() {
        return Err(GitError::EmptyRepoPath);
    }

    if !looks_like_repo(&auth.repo_path).await {
        return Err(GitError::RepoNotFound);
    }

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}

/// If `<repo>/objects` exists then the path is assumed to be a valid git
/// repository.
async fn looks_like_repo(repo_path: &str) -> bool {
    let objects = std::path::Path::new(repo_path).join("objects");
    match tokio::fs::metadata(&objects).await {
        Ok(_) => true,
        Err(error) => {
            tracing::info!(repo_path, %error, "not a git repository");
            false
        }
    }
}

/// Reference advertisement endpoint.
async fn get_info_refs(
    State(state): State<GitHttpState>,
    Query(params): Query<HashMap<String, String>>,
    Extension(auth): Extension<Authorization>,
    headers: HeaderMap,
) -> Result<Response, GitError> {
    let service = params.get("service").cloned().unwrap_or_default();
    // The 'dumb' git HTTP protocol is not supported.
    if service != "git-upload-pack" && service != "git-receive-pack" {
        return Err(GitError::UnsupportedService(service));
    }

    let actor = ActorClass::from_headers(&headers);
    METRICS.count_request("get-info-refs", actor.as_str());

    let mut child = spawn_git(&state, &auth, &service, true)?;
    let stdout = child.take_stdout().ok_or_else(|| GitError::MissingPipe {
        pipe: "stdout",
        command: child.command_line().to_string(),
    })?;

    let body = stream_response(StreamContext {
        child,
        stdout,
        announcement: Some(service_announcement(&service)),
        request_type: "get-info-refs".to_string(),
        actor: actor.as_str().to_string(),
        shallow: false,
    });

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("application/x-{}-advertisement", service),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .unwrap())
}

/// Stateless RPC endpoint for `git-upload-pack` and `git-receive-pack`.
async fn post_rpc(
    State(state): State<GitHttpState>,
    Path((_owner, _repo, action)): Path<(String, String, String)>,
    Extension(auth): Extension<Authorization>,
    request: Request,
) -> Result<Response, GitError> {
    if action != "git-upload-pack" && action != "git-receive-pack" {
        return Err(GitError::UnsupportedAction(action));
    }

    let actor = ActorClass::from_headers(request.headers());
    let request_type = format!("post-{}", action);
    METRICS.count_request(&request_type, actor.as_str());

    let body_stream = request
        .into_body()
        .into_data_stream()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
    let mut body_reader: Box<dyn AsyncRead + Unpin + Send> =
        Box::new(StreamReader::new(body_stream));

    // Only sniff the first bytes of an upload-pack body: a deepen line, if
    // any, appears at the start of the negotiation. The buffered prefix is
    // replayed so the subprocess sees the stream unaltered.
    let mut shallow = false;
    if action == "git-upload-pack" {
        let mut prefix = Vec::with_capacity(SNIFF_WINDOW);
        (&mut body_reader)
            .take(SNIFF_WINDOW as u64)
            .read_to_end(&mut prefix)
            .await
            .map_err(GitError::ReadBody)?;
        shallow = scan_deepen(&prefix);
        body_reader = Box::new(Cursor::new(prefix).chain(body_reader));
    }

    let mut child = spawn_git(&state, &auth, &action, false)?;
    let mut stdin = child.take_stdin().ok_or_else(|| GitError::MissingPipe {
        pipe: "stdin",
        command: child.command_line().to_string(),
    })?;
    let stdout = child.take_stdout().ok_or_else(|| GitError::MissingPipe {
        pipe: "stdout",
        command: child.command_line().to_string(),
    })?;

    // Drain the client body into git before reading any output. The byte
    // count is reported even when the copy fails partway.
    let (written, copied) = copy_counted(&mut body_reader, &mut stdin).await;
    METRICS.add_bytes(&request_type, actor.as_str(), "in", written);
    copied.map_err(|source| GitError::CopyIn {
        command: child.command_line().to_string(),
        source,
    })?;

    // Closing stdin signals to git that no more data is coming.
    drop(stdin);

    let body = stream_response(StreamContext {
        child,
        stdout,
        announcement: None,
        request_type,
        actor: actor.as_str().to_string(),
        shallow,
    });

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("application/x-{}-result", action),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .unwrap())
}

/// Spawns the git binary in stateless mode against the authorized
/// repository, with the actor id injected into its environment.
fn spawn_git(
    state: &GitHttpState,
    auth: &Authorization,
    service: &str,
    advertise_refs: bool,
) -> Result<Subprocess, GitError> {
    let sub_command = service.trim_start_matches("git-");
    let mut args = vec![sub_command, "--stateless-rpc"];
    if advertise_refs {
        args.push("--advertise-refs");
    }
    args.push(&auth.repo_path);

    let mut env = state.base_env.clone();
    env.insert(ACTOR_ID_ENV.to_string(), auth.actor_id.clone());

    Ok(Subprocess::spawn(&state.git_binary, &args, &env)?)
}

/// Pkt-line announcement written ahead of a ref advertisement.
fn service_announcement(service: &str) -> Vec<u8> {
    let mut buf = PktLine::from_string(&format!("# service={}\n", service)).encode();
    buf.extend_from_slice(&PktLine::Flush.encode());
    buf
}

struct StreamContext {
    child: Subprocess,
    stdout: ChildStdout,
    announcement: Option<Vec<u8>>,
    request_type: String,
    actor: String,
    shallow: bool,
}

/// Builds a streaming response body fed by the subprocess output. The 200
/// status commits as soon as the response is returned; failures past that
/// point are logged, never reported to the client.
fn stream_response(ctx: StreamContext) -> Body {
    let (sink, source) = tokio::io::duplex(STREAM_BUFFER);
    tokio::spawn(stream_output(ctx, sink));
    Body::from_stream(ReaderStream::new(source))
}

/// Copies subprocess output into the response pipe, then reaps the child.
/// Dropping the subprocess on any exit path tears down its process group.
async fn stream_output(mut ctx: StreamContext, mut sink: DuplexStream) {
    let command = ctx.child.command_line().to_string();

    if let Some(announcement) = &ctx.announcement {
        if let Err(error) = sink.write_all(announcement).await {
            tracing::error!(%command, %error, "write service announcement");
            return;
        }
    }

    let (written, copied) = copy_counted(&mut ctx.stdout, &mut sink).await;
    METRICS.add_bytes(&ctx.request_type, &ctx.actor, "out", written);
    if let Err(error) = copied {
        tracing::error!(%command, %error, "copy git output");
        return;
    }

    match ctx.child.wait().await {
        Ok(status) => {
            if report_exit_failure(status, ctx.shallow) {
                tracing::error!(%command, %status, "git exited with failure");
            }
        }
        Err(error) => tracing::error!(%command, %error, "wait for git"),
    }
}

/// Whether a git exit status should be logged as a failure.
///
/// Shallow-clone negotiations routinely end with upload-pack exiting
/// non-zero after the client hangs up, so those exits are expected.
fn report_exit_failure(status: ExitStatus, shallow: bool) -> bool {
    !status.success() && !shallow
}
