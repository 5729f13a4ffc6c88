use std::fmt::Display;

use jpics_application::{
    BatchReport, CategoryTree, InstantUploadReport, RefreshReport, UploadReport,
};
use jpics_domain::{Category, CategoryId, Picture, Session};

use crate::piwigo::DATE_FORMAT;

pub fn present_session(session: &Session) -> String {
    if !session.logged_in {
        return format!("not logged in to {}", session.server_url);
    }
    format!(
        "logged in to {} as {}{}",
        session.server_url,
        session.username,
        if session.is_admin { " (admin)" } else { "" }
    )
}

pub fn present_category_row(category: &Category) -> String {
    format!(
        "{}\t{}\t{} pictures",
        category.id, category.name, category.picture_count
    )
}

/// Categories indented under their parents, siblings in name order.
pub fn present_category_tree(tree: &CategoryTree, categories: &[Category]) -> Vec<String> {
    let mut lines = Vec::new();
    push_children(tree, categories, None, 0, &mut lines);
    lines
}

fn push_children(
    tree: &CategoryTree,
    categories: &[Category],
    parent: Option<CategoryId>,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let mut children: Vec<&Category> = tree
        .children(parent)
        .iter()
        .filter_map(|id| categories.iter().find(|category| category.id == *id))
        .collect();
    children.sort_by(|left, right| left.name.cmp(&right.name).then(left.id.cmp(&right.id)));

    for category in children {
        lines.push(format!("{}{}", "  ".repeat(depth), present_category_row(category)));
        push_children(tree, categories, Some(category.id), depth + 1, lines);
    }
}

pub fn present_picture_row(picture: &Picture) -> String {
    let created_at = picture
        .created_at
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\t{}\t{}\t{}x{}{}",
        picture.id,
        created_at,
        picture.name,
        picture.width,
        picture.height,
        if picture.archived { "\tarchived" } else { "" }
    )
}

pub fn present_refresh(report: &RefreshReport) -> String {
    format!(
        "refreshed {} categories, {} pictures, {} tags, {} users",
        report.categories, report.pictures, report.tags, report.users
    )
}

pub fn present_batch<T: Display>(action: &str, report: &BatchReport<T>) -> Vec<String> {
    let mut lines = vec![format!(
        "{action}: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    )];
    lines.extend(
        report
            .failed
            .iter()
            .map(|failure| format!("  {}: {}", failure.item, failure.reason)),
    );
    lines
}

pub fn present_upload(report: &UploadReport) -> Vec<String> {
    let mut lines = vec![format!(
        "uploaded {}, reused {}, failed {}",
        report.uploaded.len(),
        report.reused.len(),
        report.failed.len()
    )];
    lines.extend(
        report
            .failed
            .iter()
            .map(|failure| format!("  {}: {}", failure.item.display(), failure.reason)),
    );
    lines
}

pub fn present_instant_upload(report: &InstantUploadReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} new images since last run, next checkpoint {}",
        report.candidates,
        report.checkpoint.to_rfc3339()
    )];
    lines.extend(present_upload(&report.upload));
    lines
}
