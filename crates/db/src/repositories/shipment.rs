use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use transpak_core::domain::shipment::{Fragility, Shipment, ShipmentId, ValidatedShipment};
use transpak_core::domain::user::UserId;

use super::{
    decode_error, decode_timestamp, encode_timestamp, stored_now, RepositoryError,
    ShipmentRepository,
};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, user_id, item_description, dimensions, weight, origin,
        destination, fragility, special_requirements, timeline, declared_value, created_at
     FROM shipments";

pub struct SqlShipmentRepository {
    pool: DbPool,
}

impl SqlShipmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_shipment(row: &SqliteRow) -> Result<Shipment, RepositoryError> {
    let fragility: String = row.try_get("fragility").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let user_id: Option<String> = row.try_get("user_id").map_err(decode_error)?;

    Ok(Shipment {
        id: ShipmentId(row.try_get("id").map_err(decode_error)?),
        user_id: user_id.map(UserId),
        item_description: row.try_get("item_description").map_err(decode_error)?,
        dimensions: row.try_get("dimensions").map_err(decode_error)?,
        weight: row.try_get("weight").map_err(decode_error)?,
        origin: row.try_get("origin").map_err(decode_error)?,
        destination: row.try_get("destination").map_err(decode_error)?,
        fragility: fragility.parse::<Fragility>().map_err(decode_error)?,
        special_requirements: row.try_get("special_requirements").map_err(decode_error)?,
        timeline: row.try_get("timeline").map_err(decode_error)?,
        declared_value: row.try_get("declared_value").map_err(decode_error)?,
        created_at: decode_timestamp(&created_at)?,
    })
}

pub(crate) async fn insert_shipment(
    conn: &mut SqliteConnection,
    shipment: &ValidatedShipment,
    user_id: Option<&UserId>,
) -> Result<Shipment, RepositoryError> {
    let created_at = stored_now();
    let result = sqlx::query(
        "INSERT INTO shipments (user_id, item_description, dimensions, weight, origin,
                                destination, fragility, special_requirements, timeline,
                                declared_value, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id.map(|id| id.0.as_str()))
    .bind(&shipment.item_description)
    .bind(&shipment.dimensions)
    .bind(&shipment.weight)
    .bind(&shipment.origin)
    .bind(&shipment.destination)
    .bind(shipment.fragility.label())
    .bind(&shipment.special_requirements)
    .bind(&shipment.timeline)
    .bind(shipment.declared_value.as_deref())
    .bind(encode_timestamp(created_at))
    .execute(&mut *conn)
    .await?;

    Ok(Shipment {
        id: ShipmentId(result.last_insert_rowid()),
        user_id: user_id.cloned(),
        item_description: shipment.item_description.clone(),
        dimensions: shipment.dimensions.clone(),
        weight: shipment.weight.clone(),
        origin: shipment.origin.clone(),
        destination: shipment.destination.clone(),
        fragility: shipment.fragility,
        special_requirements: shipment.special_requirements.clone(),
        timeline: shipment.timeline.clone(),
        declared_value: shipment.declared_value.clone(),
        created_at,
    })
}

#[async_trait::async_trait]
impl ShipmentRepository for SqlShipmentRepository {
    async fn create(
        &self,
        shipment: &ValidatedShipment,
        user_id: Option<&UserId>,
    ) -> Result<Shipment, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_shipment(&mut conn, shipment, user_id).await
    }

    async fn find_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_shipment).transpose()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM shipments")
            .fetch_one(&self.pool)
            .await?;
        row.try_get("count").map_err(decode_error)
    }
}
