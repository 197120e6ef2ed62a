//! Static file server for the visualization bundle.
//!
//! wasm modules need an exact Content-Type and cross-origin isolation
//! headers; generic file servers often miss both, so the repo carries its
//! own tiny one.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use clap::Parser;
use mime_guess::MimeGuess;
use tiny_http::{Header, Response, Server, StatusCode};

#[derive(Parser, Debug)]
#[command(name = "wasm-serve")]
#[command(about = "Serves the forward-pass visualization bundle over HTTP")]
struct Args {
    /// Directory holding index.html and the wasm bundle
    #[arg(default_value = "www")]
    directory: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

/// Outcome of mapping a request URL onto the served directory.
#[derive(Debug)]
enum Resolved {
    File(PathBuf),
    NotFound,
    Forbidden,
}

fn main() {
    let args = Args::parse();

    let root = args.directory.canonicalize().unwrap_or_else(|_| {
        eprintln!("Error: directory '{}' not found", args.directory.display());
        std::process::exit(1);
    });

    let addr = format!("{}:{}", args.host, args.port);
    let server = Server::http(&addr).unwrap_or_else(|e| {
        eprintln!("Error starting server: {}", e);
        std::process::exit(1);
    });

    println!("Serving '{}' at http://{}", root.display(), addr);
    println!("Press Ctrl+C to stop");

    for request in server.incoming_requests() {
        let url = request.url().to_string();
        let (status, response) = match resolve(&root, &url) {
            Resolved::File(path) => match serve_file(&path) {
                Ok(response) => (200, response),
                Err(_) => (404, not_found()),
            },
            Resolved::NotFound => (404, not_found()),
            Resolved::Forbidden => (403, forbidden()),
        };
        println!("{} {} -> {}", request.method(), url, status);
        let _ = request.respond(response);
    }
}

/// Map a raw request URL to a file under `root`, or a rejection.
///
/// `/` and directory paths fall back to their index.html. The path is
/// canonicalized before the containment check, so `..` segments cannot
/// escape the served directory.
fn resolve(root: &Path, url: &str) -> Resolved {
    let path_part = url.split('?').next().unwrap_or(url);
    let decoded = percent_decode(path_part);
    let relative = decoded.trim_start_matches('/');

    let requested = if relative.is_empty() {
        root.join("index.html")
    } else {
        root.join(relative)
    };

    let canonical = match requested.canonicalize() {
        Ok(path) => path,
        Err(_) => return Resolved::NotFound,
    };
    if !canonical.starts_with(root) {
        return Resolved::Forbidden;
    }

    if canonical.is_dir() {
        Resolved::File(canonical.join("index.html"))
    } else {
        Resolved::File(canonical)
    }
}

fn serve_file(path: &Path) -> Result<Response<Cursor<Vec<u8>>>, std::io::Error> {
    let contents = fs::read(path)?;

    let mime = Header::from_bytes("Content-Type", content_type(path)).unwrap();
    let cors = Header::from_bytes("Access-Control-Allow-Origin", "*").unwrap();

    // Cross-origin isolation, required before browsers hand wasm threads
    // a SharedArrayBuffer
    let coop = Header::from_bytes("Cross-Origin-Opener-Policy", "same-origin").unwrap();
    let coep = Header::from_bytes("Cross-Origin-Embedder-Policy", "require-corp").unwrap();

    Ok(Response::from_data(contents)
        .with_header(mime)
        .with_header(cors)
        .with_header(coop)
        .with_header(coep))
}

fn content_type(path: &Path) -> &'static str {
    // wasm and module scripts come first; mime_guess is spotty on both
    match path.extension().and_then(|e| e.to_str()) {
        Some("wasm") => "application/wasm",
        Some("js") | Some("mjs") => "application/javascript",
        _ => MimeGuess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream"),
    }
}

fn not_found() -> Response<Cursor<Vec<u8>>> {
    Response::from_string("404 Not Found").with_status_code(StatusCode(404))
}

fn forbidden() -> Response<Cursor<Vec<u8>>> {
    Response::from_string("403 Forbidden").with_status_code(StatusCode(403))
}

fn percent_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '%' => {
                let hex: String = chars.by_ref().take(2).collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) => out.push(byte as char),
                    Err(_) => {
                        out.push('%');
                        out.push_str(&hex);
                    }
                }
            }
            '+' => out.push(' '),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &[u8]) {
        let mut file = File::create(path).unwrap();
        file.write_all(contents).unwrap();
    }

    #[test]
    fn test_content_type_wasm() {
        assert_eq!(content_type(Path::new("app_bg.wasm")), "application/wasm");
    }

    #[test]
    fn test_content_type_module_scripts() {
        assert_eq!(content_type(Path::new("app.js")), "application/javascript");
        assert_eq!(content_type(Path::new("init.mjs")), "application/javascript");
    }

    #[test]
    fn test_content_type_falls_back_to_guess() {
        assert_eq!(content_type(Path::new("index.html")), "text/html");
        assert_eq!(content_type(Path::new("style.css")), "text/css");
        assert_eq!(content_type(Path::new("blob.xyzzy")), "application/octet-stream");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
        assert_eq!(percent_decode("foo+bar"), "foo bar");
        assert_eq!(percent_decode("test%2Fpath"), "test/path");
        assert_eq!(percent_decode("normal"), "normal");
        assert_eq!(percent_decode("bad%zz"), "bad%zz");
    }

    #[test]
    fn test_resolve_root_serves_index() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        write_file(&root.join("index.html"), b"<html></html>");

        match resolve(&root, "/") {
            Resolved::File(path) => assert!(path.ends_with("index.html")),
            other => panic!("expected index.html, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_strips_query_string() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        write_file(&root.join("app.js"), b"export {}");

        match resolve(&root, "/app.js?v=2") {
            Resolved::File(path) => assert!(path.ends_with("app.js")),
            other => panic!("expected app.js, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_missing_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();

        assert!(matches!(resolve(&root, "/missing.js"), Resolved::NotFound));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let outer = temp.path().canonicalize().unwrap();
        write_file(&outer.join("secret.txt"), b"secret");

        let root = outer.join("www");
        fs::create_dir(&root).unwrap();
        write_file(&root.join("index.html"), b"<html></html>");

        assert!(matches!(
            resolve(&root, "/../secret.txt"),
            Resolved::Forbidden
        ));
    }

    #[test]
    fn test_resolve_directory_falls_back_to_index() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let assets = root.join("assets");
        fs::create_dir(&assets).unwrap();
        write_file(&assets.join("index.html"), b"<html></html>");

        match resolve(&root, "/assets") {
            Resolved::File(path) => assert!(path.ends_with("assets/index.html")),
            other => panic!("expected assets/index.html, got {:?}", other),
        }
    }

    #[test]
    fn test_serve_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.html");
        write_file(&path, b"<html>test</html>");

        let response = serve_file(&path).unwrap();
        assert_eq!(response.status_code().0, 200);
    }

    #[test]
    fn test_serve_file_not_found() {
        assert!(serve_file(Path::new("/nonexistent/file.txt")).is_err());
    }
}
