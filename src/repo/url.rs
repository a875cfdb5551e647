/// Embed a credential as the userinfo component of an HTTPS URL, replacing
/// any userinfo already present. Non-HTTPS URLs are returned untouched.
///
/// The returned value is transport-only: build it immediately before a clone
/// or push and never store or log it.
pub fn with_credential(url: &str, credential: Option<&str>) -> String {
    let Some(credential) = credential else {
        return url.to_string();
    };
    let Some(rest) = url.strip_prefix("https://") else {
        return url.to_string();
    };
    let host_and_path = rest.split_once('@').map_or(rest, |(_, h)| h);
    format!("https://{}@{}", credential, host_and_path)
}

/// Strip any userinfo from an HTTPS URL; this is the only form that may be
/// logged or exposed through status output.
pub fn without_credential(url: &str) -> String {
    let Some(rest) = url.strip_prefix("https://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((_, host_and_path)) => format!("https://{}", host_and_path),
        None => url.to_string(),
    }
}

/// Derive a browsable commit URL for recognized GitHub remotes, in both the
/// SSH shorthand and HTTPS forms. Unrecognized hosts yield `None` rather
/// than a guess.
pub fn commit_url(repo_url: &str, commit_id: &str) -> Option<String> {
    let repo_url = without_credential(repo_url);
    let owner_repo = if let Some(rest) = repo_url.strip_prefix("git@github.com:") {
        rest
    } else if let Some(rest) = repo_url.strip_prefix("https://github.com/") {
        rest
    } else {
        return None;
    };
    let owner_repo = owner_repo.strip_suffix(".git").unwrap_or(owner_repo);
    let owner_repo = owner_repo.trim_end_matches('/');
    if owner_repo.split('/').filter(|s| !s.is_empty()).count() != 2 {
        return None;
    }
    Some(format!(
        "https://github.com/{}/commit/{}",
        owner_repo, commit_id
    ))
}
