//! Plain-text rendering of view models and backend payloads.

use std::fmt::Write as _;

use listing_core::{
    AppViewModel, Dictionaries, DictionaryItem, FavoritesSet, FilterOptions, Notice,
    NoticeLevel, ObjectCard, ObjectDetails, ObjectView, StatusBadge, Task, TaskRowView,
};

pub fn render_live(live: bool) -> &'static str {
    if live {
        "Live"
    } else {
        "Offline"
    }
}

fn badge(badge: StatusBadge) -> &'static str {
    match badge {
        StatusBadge::Waiting => "waiting",
        StatusBadge::Working => "working",
        StatusBadge::Done => "done",
        StatusBadge::Failed => "failed",
    }
}

pub fn render_notice(notice: &Notice) -> String {
    let prefix = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!("[{prefix}] {}", notice.text)
}

fn render_row(out: &mut String, row: &TaskRowView) {
    let progress = row
        .progress
        .map(|percent| format!("{percent:>3}%"))
        .unwrap_or_else(|| "   -".to_string());
    let _ = write!(
        out,
        "{:<36}  {:<8} {}  {}  {}",
        row.id,
        badge(row.badge),
        progress,
        row.created_at.format("%Y-%m-%d %H:%M"),
        row.label,
    );
    if let Some(summary) = &row.summary {
        let _ = write!(out, "  ({summary})");
    }
    out.push('\n');
}

pub fn render_task_rows(rows: &[TaskRowView]) -> String {
    if rows.is_empty() {
        return "No tasks.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        render_row(&mut out, row);
    }
    out
}

/// Header line with the live indicator followed by the task table.
pub fn render_monitor(view: &AppViewModel) -> String {
    let mut out = format!("[{}]", render_live(view.live));
    if let Some(email) = &view.user_email {
        let _ = write!(out, " {email}");
    }
    if !view.processing.is_empty() {
        let _ = write!(out, " refreshing: {}", view.processing.join(", "));
    }
    out.push('\n');
    out.push_str(&render_task_rows(&view.tasks));
    if let Some(notice) = &view.notice {
        out.push_str(&render_notice(notice));
        out.push('\n');
    }
    out
}

pub fn render_task(task: &Task) -> String {
    let row = TaskRowView::from_task(task);
    let mut out = String::new();
    let _ = writeln!(out, "Task      {}", task.id);
    let _ = writeln!(out, "Name      {}", task.label());
    let _ = writeln!(out, "Type      {}", task.task_type);
    let _ = writeln!(out, "Status    {}", badge(row.badge));
    if let Some(percent) = row.progress {
        let _ = writeln!(out, "Progress  {percent}%");
    }
    let _ = writeln!(out, "Created   {}", task.created_at.to_rfc3339());
    if let Some(started) = task.started_at {
        let _ = writeln!(out, "Started   {}", started.to_rfc3339());
    }
    if let Some(finished) = task.finished_at {
        let _ = writeln!(out, "Finished  {}", finished.to_rfc3339());
    }
    if let Some(object_id) = task.target_object_id() {
        let _ = writeln!(out, "Object    {object_id}");
    }
    if let Some(summary) = row.summary {
        let _ = writeln!(out, "Result    {summary}");
    }
    out
}

pub fn format_with_commas(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn price(value: f64) -> String {
    if value > 0.0 {
        format!("${}", format_with_commas(value.round() as u64))
    } else {
        "-".to_string()
    }
}

pub fn render_cards(cards: &[ObjectCard], favorites: &FavoritesSet) -> String {
    if cards.is_empty() {
        return "No listings.\n".to_string();
    }
    let mut out = String::new();
    for card in cards {
        let id = if card.master_object_id.is_empty() {
            &card.id
        } else {
            &card.master_object_id
        };
        let liked = if favorites.has(id) { "*" } else { " " };
        let _ = writeln!(
            out,
            "{liked} {:<36}  {:>12}  {}  {}",
            id,
            price(card.price_usd),
            card.title,
            card.address
        );
    }
    out
}

pub fn render_filter_options(options: &FilterOptions) -> String {
    let mut out = format!("{} matching listings\n", options.count);
    for (key, option) in &options.filters {
        match (option.min, option.max) {
            (Some(min), Some(max)) => {
                let _ = writeln!(out, "  {key}: {min} .. {max}");
            }
            _ if !option.options.is_empty() => {
                let values: Vec<String> = option
                    .options
                    .iter()
                    .map(|value| match value.as_str() {
                        Some(text) => text.to_string(),
                        None => value.to_string(),
                    })
                    .collect();
                let _ = writeln!(out, "  {key}: {}", values.join(", "));
            }
            _ => {}
        }
    }
    out
}

pub fn render_object(view: &ObjectView, liked: bool) -> String {
    let general = &view.general;
    let mut out = String::new();
    let heart = if liked { " *" } else { "" };
    let _ = writeln!(out, "{}{heart}", general.title);
    let _ = writeln!(out, "Id        {}", general.master_object_id);
    let _ = writeln!(out, "Category  {} / {}", view.details.category(), general.deal_type);
    let _ = writeln!(out, "Price     {}", price(general.price_usd));
    let _ = writeln!(out, "Address   {}", general.address);
    let _ = writeln!(out, "Source    {} {}", general.source, general.ad_link);
    if let Some(area) = view.details.total_area() {
        let _ = writeln!(out, "Area      {area} m2");
    }
    match &view.details {
        ObjectDetails::Apartment(details) => {
            if let Some(rooms) = details.rooms_amount {
                let _ = writeln!(out, "Rooms     {rooms}");
            }
            if let (Some(floor), Some(floors)) = (details.floor_number, details.building_floors) {
                let _ = writeln!(out, "Floor     {floor}/{floors}");
            }
        }
        ObjectDetails::House(details) => {
            if let Some(plot) = details.plot_area {
                let _ = writeln!(out, "Plot      {plot}");
            }
            if let Some(kind) = &details.house_type {
                let _ = writeln!(out, "Type      {kind}");
            }
        }
        ObjectDetails::Commercial(details) => {
            if let Some(kind) = &details.property_type {
                let _ = writeln!(out, "Type      {kind}");
            }
        }
    }
    if let Some(updated) = &general.updated_at {
        let _ = writeln!(out, "Updated   {updated}");
    }
    if !view.related_offers.is_empty() {
        let _ = writeln!(out, "Also listed on:");
        for offer in &view.related_offers {
            let _ = writeln!(out, "  {} {}", offer.source, offer.ad_link);
        }
    }
    out
}

fn render_items(out: &mut String, title: &str, items: &[DictionaryItem]) {
    let _ = writeln!(out, "{title}:");
    for item in items {
        let _ = writeln!(out, "  {:<24} {}", item.system_name, item.display_name);
    }
}

pub fn render_dictionaries(dictionaries: &Dictionaries) -> String {
    let mut out = String::new();
    render_items(&mut out, "Categories", &dictionaries.categories);
    render_items(&mut out, "Regions", &dictionaries.regions);
    render_items(&mut out, "Deal types", &dictionaries.deal_types);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(format_with_commas(0), "0");
        assert_eq!(format_with_commas(999), "999");
        assert_eq!(format_with_commas(1000), "1,000");
        assert_eq!(format_with_commas(1234567), "1,234,567");
    }

    #[test]
    fn favorites_are_starred_in_listings() {
        let mut favorites = FavoritesSet::new();
        favorites.load(["obj-2"]);
        let card = |id: &str| ObjectCard {
            id: format!("src-{id}"),
            title: "Flat".to_string(),
            price_usd: 52000.4,
            price_byn: 0.0,
            address: "Minsk".to_string(),
            images: Vec::new(),
            master_object_id: id.to_string(),
            status: "active".to_string(),
            deal_type: "sale".to_string(),
            category: "apartment".to_string(),
        };

        let text = render_cards(&[card("obj-1"), card("obj-2")], &favorites);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("  obj-1"));
        assert!(lines[1].starts_with("* obj-2"));
        assert!(lines[1].contains("$52,000"));
    }

    #[test]
    fn empty_monitor_shows_offline_state() {
        let view = listing_core::AppState::new().view();
        assert_eq!(render_monitor(&view), "[Offline]\nNo tasks.\n");
    }
}
