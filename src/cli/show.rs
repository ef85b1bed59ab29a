use super::ui;
use crate::core::record::User;
use crate::core::store::Store;
use anyhow::{Context, Result};
use comfy_table::Cell;

/// Renders stored users with their converted balances.
pub fn users_table(users: &[User], base_currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Name"),
        ui::header_cell("Email"),
        ui::header_cell("Currency"),
        ui::header_cell("Balance"),
        ui::header_cell(&format!("Converted ({base_currency})")),
    ]);

    for user in users {
        table.add_row(vec![
            Cell::new(user.id),
            Cell::new(user.full_name()),
            Cell::new(&user.email),
            Cell::new(&user.currency),
            ui::amount_cell(user.balance),
            ui::format_optional_cell(user.converted_balance, |v| format!("{v:.2}")),
        ]);
    }
    table.to_string()
}

pub async fn show(store: &dyn Store, base_currency: &str) -> Result<()> {
    let users = store.users().await.context("Failed to read users")?;
    if users.is_empty() {
        println!("No users stored yet.");
        return Ok(());
    }

    println!("{}", ui::style_text("Users", ui::StyleType::Title));
    println!("{}", users_table(&users, base_currency));
    Ok(())
}
