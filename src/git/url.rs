//! Repository URL normalization.
//!
//! Every repository is keyed by its *normalized* URL: the protocol-free,
//! `.git`-free `host/owner/repo` form. The normalized form is used in the
//! status document and as the directory prefix under `repositories-dir`, so
//! normalization must be deterministic and idempotent.

use crate::errors::Error;

/// A repository URL reduced to its canonical key form.
///
/// # Accepted inputs
///
/// - `https://<host>/<path>/<repo>[.git]`
/// - `http://<host>/<path>/<repo>[.git]`
/// - `ssh://[git@]<host>/<path>/<repo>[.git]`
/// - `git@<host>:<path>/<repo>[.git]`
/// - bare `<host>/<path>/<repo>` (already-normalized form)
///
/// # Example
///
/// ```
/// use arbor::git::RepoUrl;
///
/// let url = RepoUrl::normalize("git@github.com:octocat/Hello-World.git").unwrap();
/// assert_eq!(url.as_str(), "github.com/octocat/Hello-World");
/// assert_eq!(url.name(), "Hello-World");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoUrl(String);

impl RepoUrl {
    /// Normalize a repository URL into its canonical key.
    ///
    /// The rule is total over non-empty inputs that keep at least one `/`
    /// separated segment after stripping:
    ///
    /// 1. strip a leading `https://`, `http://`, or `ssh://`
    /// 2. strip a leading `git@`; convert the single `:` between host and
    ///    path to `/`
    /// 3. strip a trailing `/`, then a trailing `.git`
    pub fn normalize(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::RepositoryUrlEmpty);
        }

        let mut rest = trimmed;
        for protocol in ["https://", "http://", "ssh://"] {
            if let Some(stripped) = rest.strip_prefix(protocol) {
                rest = stripped;
                break;
            }
        }

        let mut normalized = match rest.strip_prefix("git@") {
            Some(stripped) => {
                // scp-like syntax: the colon separates host from path
                match stripped.split_once(':') {
                    Some((host, path)) => format!("{host}/{path}"),
                    None => stripped.to_string(),
                }
            }
            None => match rest.split_once('/') {
                // ssh://user@host/path keeps its user after protocol stripping
                Some((host, path)) => {
                    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
                    format!("{host}/{path}")
                }
                None => rest.to_string(),
            },
        };

        if let Some(stripped) = normalized.strip_suffix('/') {
            normalized = stripped.to_string();
        }
        if let Some(stripped) = normalized.strip_suffix(".git") {
            normalized = stripped.to_string();
        }

        // The key must have a host plus at least one path segment, none empty.
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            return Err(Error::UnsupportedRepositoryUrlFormat {
                url: trimmed.to_string(),
            });
        }

        Ok(Self(segments.join("/")))
    }

    /// The canonical key, e.g. `github.com/octocat/Hello-World`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The repository leaf name (last path segment), e.g. `Hello-World`.
    ///
    /// Used as the folder label in workspace descriptor files.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_urls() {
        let url = RepoUrl::normalize("https://github.com/owner/repo.git").unwrap();
        assert_eq!(url.as_str(), "github.com/owner/repo");

        // Without .git suffix
        let url = RepoUrl::normalize("https://github.com/owner/repo").unwrap();
        assert_eq!(url.as_str(), "github.com/owner/repo");

        // With whitespace and trailing slash
        let url = RepoUrl::normalize("  https://github.com/owner/repo/\n").unwrap();
        assert_eq!(url.as_str(), "github.com/owner/repo");
    }

    #[test]
    fn test_http_urls() {
        let url = RepoUrl::normalize("http://gitlab.internal.company.com/owner/repo.git").unwrap();
        assert_eq!(url.as_str(), "gitlab.internal.company.com/owner/repo");
    }

    #[test]
    fn test_git_at_urls() {
        let url = RepoUrl::normalize("git@github.com:owner/repo.git").unwrap();
        assert_eq!(url.as_str(), "github.com/owner/repo");

        let url = RepoUrl::normalize("git@gitlab.example.com:group/sub/repo").unwrap();
        assert_eq!(url.as_str(), "gitlab.example.com/group/sub/repo");
    }

    #[test]
    fn test_ssh_urls() {
        let url = RepoUrl::normalize("ssh://git@github.com/owner/repo.git").unwrap();
        assert_eq!(url.as_str(), "github.com/owner/repo");

        let url = RepoUrl::normalize("ssh://github.com/owner/repo.git").unwrap();
        assert_eq!(url.as_str(), "github.com/owner/repo");
    }

    #[test]
    fn test_bare_form() {
        let url = RepoUrl::normalize("github.com/octocat/Hello-World").unwrap();
        assert_eq!(url.as_str(), "github.com/octocat/Hello-World");
    }

    #[test]
    fn test_equivalence_classes() {
        // Inputs differing only in protocol / .git / trailing slash share a key
        let inputs = [
            "https://github.com/octocat/Hello-World.git",
            "https://github.com/octocat/Hello-World",
            "https://github.com/octocat/Hello-World/",
            "ssh://git@github.com/octocat/Hello-World.git",
            "git@github.com:octocat/Hello-World.git",
            "github.com/octocat/Hello-World",
        ];
        for input in inputs {
            assert_eq!(
                RepoUrl::normalize(input).unwrap().as_str(),
                "github.com/octocat/Hello-World",
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://github.com/owner/repo.git",
            "git@gitlab.example.com:group/sub/repo",
            "host/a/b",
        ];
        for input in inputs {
            let once = RepoUrl::normalize(input).unwrap();
            let twice = RepoUrl::normalize(once.as_str()).unwrap();
            assert_eq!(once, twice, "input: {input}");
        }
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            RepoUrl::normalize(""),
            Err(Error::RepositoryUrlEmpty)
        ));
        assert!(matches!(
            RepoUrl::normalize("   "),
            Err(Error::RepositoryUrlEmpty)
        ));
        assert!(matches!(
            RepoUrl::normalize("just-a-host"),
            Err(Error::UnsupportedRepositoryUrlFormat { .. })
        ));
        assert!(matches!(
            RepoUrl::normalize("https://github.com/"),
            Err(Error::UnsupportedRepositoryUrlFormat { .. })
        ));
    }

    #[test]
    fn test_name() {
        let url = RepoUrl::normalize("github.com/octocat/Hello-World").unwrap();
        assert_eq!(url.name(), "Hello-World");
    }

    #[test]
    fn test_local_path_keys() {
        // Absolute paths to local clones normalize to a usable key too;
        // the leading slash is dropped with the empty segment filter.
        let url = RepoUrl::normalize("/srv/mirrors/team/repo").unwrap();
        assert_eq!(url.as_str(), "srv/mirrors/team/repo");
    }
}
