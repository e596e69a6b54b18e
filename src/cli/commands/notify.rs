use crate::cli::commands::open_db;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::notifications::{load_for_recipient, mark_read};
use crate::errors::AppResult;
use crate::ui::messages::{info, success};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Notify {
        recipient,
        unread,
        read,
    } = cmd
    {
        let pool = open_db(cfg)?;

        if let Some(id) = read {
            mark_read(&pool.conn, *id, recipient)?;
            success(format!("Notification #{id} marked as read."));
            return Ok(());
        }

        let rows = load_for_recipient(&pool.conn, recipient, *unread)?;
        if rows.is_empty() {
            info(format!("No notifications for {recipient}."));
            return Ok(());
        }

        for n in rows {
            let payload = serde_json::to_string(&n.event)?;
            println!(
                "{:>5}  {}  {}  {:<18} from {:<10} {}",
                n.id,
                n.created_at.format("%Y-%m-%d %H:%M:%S"),
                if n.is_read { " " } else { "*" },
                n.event.verb(),
                n.actor_id,
                payload
            );
        }
    }
    Ok(())
}
