//! SQLite-Implementierung des ButtonRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quizhub_core::{RoomCode, TeamId};
use sqlx::Row;

use crate::error::DbError;
use crate::models::{button_schluessel, mac_normalisieren, ButtonRecord, ButtonZuordnung};
use crate::repository::{ButtonRepository, DbResult};
use crate::sqlite::pool::SqliteDb;

const SPALTEN: &str = "id, mac_address, button_id, name, room_code, team_id, team_name,
     is_active, press_count, last_press, created_at, updated_at";

/// Normalisiert und prueft eine MAC-Adresse
fn mac_pruefen(mac: &str) -> DbResult<String> {
    let normalisiert = mac_normalisieren(mac);
    if normalisiert.is_empty() {
        return Err(DbError::ungueltig("MAC-Adresse darf nicht leer sein"));
    }
    if !normalisiert.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DbError::ungueltig(format!(
            "MAC-Adresse enthaelt ungueltige Zeichen: {mac}"
        )));
    }
    Ok(normalisiert)
}

impl SqliteDb {
    async fn button_laden_normalisiert(&self, mac: &str) -> DbResult<Option<ButtonRecord>> {
        let sql = format!("SELECT {SPALTEN} FROM hardware_buttons WHERE mac_address = ?");
        let row = sqlx::query(&sql)
            .bind(mac)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_button(&r)).transpose()
    }

    async fn button_erwarten(&self, mac: &str) -> DbResult<ButtonRecord> {
        self.button_laden_normalisiert(mac)
            .await?
            .ok_or_else(|| DbError::nicht_gefunden(format!("Button {mac}")))
    }
}

#[async_trait]
impl ButtonRepository for SqliteDb {
    async fn registrieren(&self, mac: &str, button_id: &str, name: &str) -> DbResult<ButtonRecord> {
        let mac = mac_pruefen(mac)?;
        let button_id = if button_id.trim().is_empty() {
            "1"
        } else {
            button_id.trim()
        };
        let now_str = Utc::now().to_rfc3339();

        let ergebnis = sqlx::query(
            "INSERT INTO hardware_buttons (id, mac_address, button_id, name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(mac_address) DO UPDATE SET
                button_id = excluded.button_id,
                name = CASE WHEN excluded.name = '' THEN hardware_buttons.name ELSE excluded.name END,
                updated_at = excluded.updated_at",
        )
        .bind(button_schluessel(&mac))
        .bind(&mac)
        .bind(button_id)
        .bind(name.trim())
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await;

        match ergebnis {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(DbError::Eindeutigkeit(format!(
                    "Button-ID {} bereits von anderer MAC belegt",
                    button_schluessel(&mac)
                )));
            }
            Err(e) => return Err(e.into()),
        }

        self.button_erwarten(&mac).await
    }

    async fn laden(&self, mac: &str) -> DbResult<Option<ButtonRecord>> {
        let mac = mac_pruefen(mac)?;
        self.button_laden_normalisiert(&mac).await
    }

    async fn druck_erfassen(&self, mac: &str) -> DbResult<ButtonRecord> {
        let mac = mac_pruefen(mac)?;
        let now_str = Utc::now().to_rfc3339();

        let affected = sqlx::query(
            "UPDATE hardware_buttons
             SET press_count = press_count + 1, last_press = ?, updated_at = ?
             WHERE mac_address = ? AND is_active = 1",
        )
        .bind(&now_str)
        .bind(&now_str)
        .bind(&mac)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return match self.button_laden_normalisiert(&mac).await? {
                Some(_) => Err(DbError::ButtonInaktiv(mac)),
                None => Err(DbError::nicht_gefunden(format!("Button {mac}"))),
            };
        }

        self.button_erwarten(&mac).await
    }

    async fn zuordnen(&self, mac: &str, zuordnung: ButtonZuordnung<'_>) -> DbResult<ButtonRecord> {
        let mac = mac_pruefen(mac)?;
        let affected = sqlx::query(
            "UPDATE hardware_buttons
             SET room_code = ?, team_id = ?, team_name = ?, updated_at = ?
             WHERE mac_address = ?",
        )
        .bind(zuordnung.room_code.as_str())
        .bind(zuordnung.team_id.inner().to_string())
        .bind(zuordnung.team_name)
        .bind(Utc::now().to_rfc3339())
        .bind(&mac)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Button {mac}")));
        }
        self.button_erwarten(&mac).await
    }

    async fn zuordnung_aufheben(&self, mac: &str) -> DbResult<ButtonRecord> {
        let mac = mac_pruefen(mac)?;
        let affected = sqlx::query(
            "UPDATE hardware_buttons
             SET room_code = NULL, team_id = NULL, team_name = '', updated_at = ?
             WHERE mac_address = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(&mac)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Button {mac}")));
        }
        self.button_erwarten(&mac).await
    }

    async fn team_zuordnungen_aufheben(&self, room: &RoomCode, team: TeamId) -> DbResult<u64> {
        let affected = sqlx::query(
            "UPDATE hardware_buttons
             SET room_code = NULL, team_id = NULL, team_name = '', updated_at = ?
             WHERE room_code = ? AND team_id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(room.as_str())
        .bind(team.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected)
    }

    async fn aktiv_setzen(&self, mac: &str, aktiv: bool) -> DbResult<ButtonRecord> {
        let mac = mac_pruefen(mac)?;
        let affected = sqlx::query(
            "UPDATE hardware_buttons SET is_active = ?, updated_at = ? WHERE mac_address = ?",
        )
        .bind(aktiv)
        .bind(Utc::now().to_rfc3339())
        .bind(&mac)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Button {mac}")));
        }
        self.button_erwarten(&mac).await
    }

    async fn alle(&self) -> DbResult<Vec<ButtonRecord>> {
        let sql = format!("SELECT {SPALTEN} FROM hardware_buttons ORDER BY mac_address");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_button).collect()
    }

    async fn fuer_raum(&self, room: &RoomCode) -> DbResult<Vec<ButtonRecord>> {
        let sql = format!(
            "SELECT {SPALTEN} FROM hardware_buttons WHERE room_code = ? ORDER BY mac_address"
        );
        let rows = sqlx::query(&sql)
            .bind(room.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_button).collect()
    }

    async fn loeschen(&self, mac: &str) -> DbResult<bool> {
        let mac = mac_pruefen(mac)?;
        let affected = sqlx::query("DELETE FROM hardware_buttons WHERE mac_address = ?")
            .bind(&mac)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }
}

fn row_to_button(row: &sqlx::sqlite::SqliteRow) -> DbResult<ButtonRecord> {
    let room_code = row
        .try_get::<Option<String>, _>("room_code")?
        .map(|s| {
            RoomCode::parse(&s)
                .map_err(|e| DbError::intern(format!("Ungueltiger room_code '{s}': {e}")))
        })
        .transpose()?;

    let team_id = row
        .try_get::<Option<String>, _>("team_id")?
        .map(|s| {
            s.parse::<TeamId>()
                .map_err(|e| DbError::intern(format!("Ungueltige team_id '{s}': {e}")))
        })
        .transpose()?;

    Ok(ButtonRecord {
        id: row.try_get("id")?,
        mac_address: row.try_get("mac_address")?,
        button_id: row.try_get("button_id")?,
        name: row.try_get("name")?,
        room_code,
        team_id,
        team_name: row.try_get("team_name")?,
        is_active: row.try_get("is_active")?,
        press_count: row.try_get("press_count")?,
        last_press: parse_opt_datetime(row, "last_press")?,
        created_at: parse_datetime(row, "created_at")?,
        updated_at: parse_datetime(row, "updated_at")?,
    })
}

fn parse_datetime(row: &sqlx::sqlite::SqliteRow, col: &str) -> DbResult<DateTime<Utc>> {
    parse_opt_datetime(row, col)?
        .ok_or_else(|| DbError::intern(format!("Spalte '{col}' ist leer")))
}

fn parse_opt_datetime(row: &sqlx::sqlite::SqliteRow, col: &str) -> DbResult<Option<DateTime<Utc>>> {
    let s: Option<String> = row.try_get(col)?;
    s.as_deref()
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DbError::intern(format!("Ungueltige DateTime in '{col}': {e}")))
        })
        .transpose()
}
