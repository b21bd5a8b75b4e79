use pipeline_core::{AppViewModel, OperationStatus, PluginType};

/// Renders the view model as the lines of a status panel.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    let session = if view.logged_in {
        match &view.token_type {
            Some(token_type) => format!("logged in ({token_type})"),
            None => "logged in".to_string(),
        }
    } else {
        "logged out".to_string()
    };
    lines.push(format!("API: {} | Session: {}", view.origin, session));
    lines.push(format!("Login: {}", status_label(&view.login)));

    let selector = PluginType::ALL
        .iter()
        .map(|kind| {
            if *kind == view.plugin_type {
                format!("[x] {} ({})", kind.label(), kind)
            } else {
                format!("[ ] {} ({})", kind.label(), kind)
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    lines.push(format!("Plugin: {selector}"));
    lines.push(format!("Repo URL: {}", display_or_dash(&view.repo_url)));
    lines.push(format!(
        "File: {}",
        view.file_name.as_deref().unwrap_or("-")
    ));

    let run_button = if view.submit_enabled {
        "Run Plugin"
    } else {
        "Run Plugin (disabled: log in first)"
    };
    lines.push(format!("{} | {}", run_button, status_label(&view.submit)));

    if let Some(result) = &view.result {
        let success = match result.success {
            Some(true) => "success",
            Some(false) => "reported failure",
            None => "no status",
        };
        lines.push(format!("Result: {success}"));
    }

    if let Some(link) = &view.download_link {
        lines.push(format!("Download Result: {link}"));
        lines.push(format!("Download: {}", status_label(&view.download)));
        if let Some(path) = &view.saved_artifact {
            lines.push(format!("Saved to: {}", path.display()));
        }
    }

    lines
}

fn status_label(status: &OperationStatus) -> String {
    match status {
        OperationStatus::Idle => "idle".to_string(),
        OperationStatus::Pending => "in progress...".to_string(),
        OperationStatus::Succeeded => "done".to_string(),
        OperationStatus::Failed(reason) => format!("FAILED: {reason}"),
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}
