use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;

use crate::models::{
    BecomeDonorRequest, BloodRequest, BloodType, BoundingBox, CreateBloodRequestRequest,
    CreateDonorRequest, CreateHospitalRequest, Donor, Hospital, RequestStatus,
    UpdateBloodRequestRequest, UpdateDonorRequest,
};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Page size of the blood request listing
pub const REQUESTS_PER_PAGE: u32 = 10;

const DONOR_COLUMNS: &str = "id, name, blood_type, phone, email, city, address, latitude, longitude, \
     is_available, last_donation_date, total_donations, user_id, created_at, updated_at";

const HOSPITAL_COLUMNS: &str = "id, name, phone, email, city, address, latitude, longitude, \
     description, has_blood_bank, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, user_id, blood_type, units_needed, hospital_name, hospital_address, \
     city, latitude, longitude, urgency_level, patient_name, contact_phone, additional_notes, \
     status, created_at, updated_at";

/// PostgreSQL storage for donors, hospitals and blood requests
///
/// Radius queries only narrow rows down to a bounding box; exact distances
/// and ordering are left to the proximity filter. Every candidate query is
/// ordered by id so distance ties resolve the same way on every call.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connect, then run the embedded migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL (max {} connections)", max_connections.unwrap_or(10));

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Pool that opens connections on first use and skips migrations
    pub fn lazy(database_url: &str, max_connections: u32) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    // ── Donors ───────────────────────────────────────────────────────────────

    /// Donors whose coordinates fall inside the box
    pub async fn donors_in_bounds(
        &self,
        bbox: &BoundingBox,
        available_only: bool,
    ) -> Result<Vec<Donor>, PostgresError> {
        let query = format!(
            r#"
            SELECT {DONOR_COLUMNS}
            FROM donors
            WHERE latitude BETWEEN $1 AND $2
              AND longitude BETWEEN $3 AND $4
              AND ($5 = FALSE OR is_available)
            ORDER BY id
            "#
        );

        let donors = sqlx::query_as::<_, Donor>(&query)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .bind(available_only)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Loaded {} donor candidates inside {:?}", donors.len(), bbox);

        Ok(donors)
    }

    pub async fn list_donors(&self) -> Result<Vec<Donor>, PostgresError> {
        let query = format!("SELECT {DONOR_COLUMNS} FROM donors ORDER BY id");
        Ok(sqlx::query_as::<_, Donor>(&query).fetch_all(&self.pool).await?)
    }

    pub async fn get_donor(&self, id: i64) -> Result<Donor, PostgresError> {
        let query = format!("SELECT {DONOR_COLUMNS} FROM donors WHERE id = $1");

        sqlx::query_as::<_, Donor>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("donor {}", id)))
    }

    /// Donor record linked to an authenticated user, if any
    pub async fn donor_for_user(&self, user_id: &str) -> Result<Option<Donor>, PostgresError> {
        let query = format!("SELECT {DONOR_COLUMNS} FROM donors WHERE user_id = $1");

        Ok(sqlx::query_as::<_, Donor>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn create_donor(&self, req: &CreateDonorRequest) -> Result<Donor, PostgresError> {
        let query = format!(
            r#"
            INSERT INTO donors (name, blood_type, phone, email, city, address, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {DONOR_COLUMNS}
            "#
        );

        let donor = sqlx::query_as::<_, Donor>(&query)
            .bind(&req.name)
            .bind(req.blood_type)
            .bind(&req.phone)
            .bind(&req.email)
            .bind(&req.city)
            .bind(&req.address)
            .bind(req.latitude)
            .bind(req.longitude)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "a donor with this email already exists"))?;

        tracing::info!("Registered donor {} ({})", donor.id, donor.blood_type);

        Ok(donor)
    }

    /// Apply the fields present in `req`, leaving the rest untouched
    pub async fn update_donor(
        &self,
        id: i64,
        req: &UpdateDonorRequest,
    ) -> Result<Donor, PostgresError> {
        let query = format!(
            r#"
            UPDATE donors SET
                name = COALESCE($2, name),
                blood_type = COALESCE($3, blood_type),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                city = COALESCE($6, city),
                address = COALESCE($7, address),
                latitude = COALESCE($8, latitude),
                longitude = COALESCE($9, longitude),
                is_available = COALESCE($10, is_available),
                last_donation_date = COALESCE($11, last_donation_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {DONOR_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Donor>(&query)
            .bind(id)
            .bind(&req.name)
            .bind(req.blood_type)
            .bind(&req.phone)
            .bind(&req.email)
            .bind(&req.city)
            .bind(&req.address)
            .bind(req.latitude)
            .bind(req.longitude)
            .bind(req.is_available)
            .bind(req.last_donation_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "a donor with this email already exists"))?
            .ok_or_else(|| PostgresError::NotFound(format!("donor {}", id)))
    }

    /// Returns false when the donor did not exist
    pub async fn delete_donor(&self, id: i64) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM donors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Create or refresh the donor record and medical profile of a user.
    ///
    /// Both rows are written in one transaction. Eligibility must be checked
    /// by the caller.
    pub async fn become_donor(
        &self,
        user_id: &str,
        req: &BecomeDonorRequest,
    ) -> Result<Donor, PostgresError> {
        let mut tx = self.pool.begin().await?;

        let donor_query = format!(
            r#"
            INSERT INTO donors
                (name, blood_type, phone, city, address, latitude, longitude,
                 is_available, last_donation_date, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
                name = EXCLUDED.name,
                blood_type = EXCLUDED.blood_type,
                phone = EXCLUDED.phone,
                city = EXCLUDED.city,
                address = EXCLUDED.address,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                is_available = TRUE,
                last_donation_date = EXCLUDED.last_donation_date,
                updated_at = NOW()
            RETURNING {DONOR_COLUMNS}
            "#
        );

        let donor = sqlx::query_as::<_, Donor>(&donor_query)
            .bind(&req.name)
            .bind(req.blood_type)
            .bind(&req.phone)
            .bind(&req.city)
            .bind(&req.address)
            .bind(req.latitude)
            .bind(req.longitude)
            .bind(req.last_donation_date)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO donor_profiles
                (donor_id, date_of_birth, weight_kg, height_cm, medical_conditions,
                 medications, health_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (donor_id) DO UPDATE SET
                date_of_birth = EXCLUDED.date_of_birth,
                weight_kg = EXCLUDED.weight_kg,
                height_cm = EXCLUDED.height_cm,
                medical_conditions = EXCLUDED.medical_conditions,
                medications = EXCLUDED.medications,
                health_status = EXCLUDED.health_status,
                updated_at = NOW()
            "#,
        )
        .bind(donor.id)
        .bind(req.date_of_birth)
        .bind(req.weight)
        .bind(req.height)
        .bind(&req.medical_conditions)
        .bind(&req.medications)
        .bind(&req.health_status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("User {} registered as donor {}", user_id, donor.id);

        Ok(donor)
    }

    // ── Hospitals ────────────────────────────────────────────────────────────

    pub async fn hospitals_in_bounds(&self, bbox: &BoundingBox) -> Result<Vec<Hospital>, PostgresError> {
        let query = format!(
            r#"
            SELECT {HOSPITAL_COLUMNS}
            FROM hospitals
            WHERE latitude BETWEEN $1 AND $2
              AND longitude BETWEEN $3 AND $4
            ORDER BY id
            "#
        );

        let hospitals = sqlx::query_as::<_, Hospital>(&query)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Loaded {} hospital candidates inside {:?}", hospitals.len(), bbox);

        Ok(hospitals)
    }

    pub async fn create_hospital(&self, req: &CreateHospitalRequest) -> Result<Hospital, PostgresError> {
        let query = format!(
            r#"
            INSERT INTO hospitals
                (name, phone, email, city, address, latitude, longitude, description, has_blood_bank)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {HOSPITAL_COLUMNS}
            "#
        );

        Ok(sqlx::query_as::<_, Hospital>(&query)
            .bind(&req.name)
            .bind(&req.phone)
            .bind(&req.email)
            .bind(&req.city)
            .bind(&req.address)
            .bind(req.latitude)
            .bind(req.longitude)
            .bind(&req.description)
            .bind(req.has_blood_bank)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Insert a batch of hospitals atomically
    pub async fn insert_hospitals(
        &self,
        hospitals: &[CreateHospitalRequest],
    ) -> Result<u64, PostgresError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for h in hospitals {
            let result = sqlx::query(
                r#"
                INSERT INTO hospitals
                    (name, phone, email, city, address, latitude, longitude, description, has_blood_bank)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(&h.name)
            .bind(&h.phone)
            .bind(&h.email)
            .bind(&h.city)
            .bind(&h.address)
            .bind(h.latitude)
            .bind(h.longitude)
            .bind(&h.description)
            .bind(h.has_blood_bank)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        tracing::info!("Seeded {} hospitals", inserted);

        Ok(inserted)
    }

    // ── Blood requests ───────────────────────────────────────────────────────

    /// Pending and in-progress requests inside the box
    pub async fn open_requests_in_bounds(
        &self,
        bbox: &BoundingBox,
    ) -> Result<Vec<BloodRequest>, PostgresError> {
        let query = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM blood_requests
            WHERE latitude BETWEEN $1 AND $2
              AND longitude BETWEEN $3 AND $4
              AND status IN ('pending', 'in_progress')
            ORDER BY id
            "#
        );

        let requests = sqlx::query_as::<_, BloodRequest>(&query)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Loaded {} open request candidates inside {:?}", requests.len(), bbox);

        Ok(requests)
    }

    /// Newest first, `REQUESTS_PER_PAGE` per page, 1-based page number
    pub async fn list_requests(
        &self,
        status: Option<RequestStatus>,
        blood_type: Option<BloodType>,
        page: u32,
    ) -> Result<(Vec<BloodRequest>, i64), PostgresError> {
        let page = page.max(1);
        let offset = i64::from(page - 1) * i64::from(REQUESTS_PER_PAGE);

        let query = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM blood_requests
            WHERE ($1::request_status IS NULL OR status = $1)
              AND ($2::blood_type IS NULL OR blood_type = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        );

        let rows = sqlx::query_as::<_, BloodRequest>(&query)
            .bind(status)
            .bind(blood_type)
            .bind(i64::from(REQUESTS_PER_PAGE))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM blood_requests
            WHERE ($1::request_status IS NULL OR status = $1)
              AND ($2::blood_type IS NULL OR blood_type = $2)
            "#,
        )
        .bind(status)
        .bind(blood_type)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// The user's own requests, newest first
    pub async fn recent_requests_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<BloodRequest>, PostgresError> {
        let query = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM blood_requests
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        );

        Ok(sqlx::query_as::<_, BloodRequest>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_request(&self, id: i64) -> Result<BloodRequest, PostgresError> {
        let query = format!("SELECT {REQUEST_COLUMNS} FROM blood_requests WHERE id = $1");

        sqlx::query_as::<_, BloodRequest>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("blood request {}", id)))
    }

    pub async fn create_request(
        &self,
        user_id: &str,
        req: &CreateBloodRequestRequest,
    ) -> Result<BloodRequest, PostgresError> {
        let query = format!(
            r#"
            INSERT INTO blood_requests
                (user_id, blood_type, units_needed, hospital_name, hospital_address, city,
                 latitude, longitude, urgency_level, patient_name, contact_phone, additional_notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {REQUEST_COLUMNS}
            "#
        );

        let request = sqlx::query_as::<_, BloodRequest>(&query)
            .bind(user_id)
            .bind(req.blood_type)
            .bind(req.units_needed)
            .bind(&req.hospital_name)
            .bind(&req.hospital_address)
            .bind(&req.city)
            .bind(req.latitude)
            .bind(req.longitude)
            .bind(req.urgency_level)
            .bind(&req.patient_name)
            .bind(&req.contact_phone)
            .bind(&req.additional_notes)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(
            "Blood request {} created by {} ({} x{}, {:?})",
            request.id,
            user_id,
            request.blood_type,
            request.units_needed,
            request.urgency_level
        );

        Ok(request)
    }

    pub async fn update_request(
        &self,
        id: i64,
        req: &UpdateBloodRequestRequest,
    ) -> Result<BloodRequest, PostgresError> {
        let query = format!(
            r#"
            UPDATE blood_requests SET
                status = COALESCE($2, status),
                additional_notes = COALESCE($3, additional_notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, BloodRequest>(&query)
            .bind(id)
            .bind(req.status)
            .bind(&req.additional_notes)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("blood request {}", id)))
    }

    pub async fn delete_request(&self, id: i64) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM blood_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Turn a unique-constraint violation into `Conflict`, pass everything else through
fn conflict_or(err: sqlx::Error, message: &str) -> PostgresError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PostgresError::Conflict(message.to_string())
        }
        _ => PostgresError::SqlxError(err),
    }
}
