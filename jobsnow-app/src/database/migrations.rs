use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    // Local identity store
    conn.execute(
        "CREATE TABLE IF NOT EXISTS auth_users (
            id VARCHAR PRIMARY KEY,
            email VARCHAR NOT NULL UNIQUE,
            password_hash VARCHAR NOT NULL,
            user_metadata VARCHAR NOT NULL DEFAULT '{}',
            email_confirmed_at BIGINT,
            created_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS auth_sessions (
            access_token VARCHAR PRIMARY KEY,
            user_id VARCHAR NOT NULL,
            refresh_token VARCHAR NOT NULL,
            expires_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES auth_users (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            id VARCHAR PRIMARY KEY,
            email VARCHAR NOT NULL,
            user_type VARCHAR NOT NULL CHECK (user_type IN ('candidate', 'company')),
            created_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (id) REFERENCES auth_users (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS candidate_profiles (
            id VARCHAR PRIMARY KEY,
            full_name VARCHAR,
            phone VARCHAR,
            address VARCHAR,
            birth_date VARCHAR,
            nationality VARCHAR,
            ancestry VARCHAR,
            bio VARCHAR,
            languages VARCHAR,
            resume_url VARCHAR,
            is_profile_complete BOOLEAN DEFAULT 0,
            created_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (id) REFERENCES profiles (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS company_profiles (
            id VARCHAR PRIMARY KEY,
            company_name VARCHAR,
            responsible_name VARCHAR,
            phone VARCHAR,
            address VARCHAR,
            website VARCHAR,
            cnpj VARCHAR,
            sector VARCHAR,
            employee_count INTEGER,
            founded_year INTEGER,
            description VARCHAR,
            logo_url VARCHAR,
            is_verified BOOLEAN DEFAULT 0,
            is_profile_complete BOOLEAN DEFAULT 0,
            created_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (id) REFERENCES profiles (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS jobs (
            id VARCHAR PRIMARY KEY,
            company_id VARCHAR NOT NULL,
            title VARCHAR NOT NULL,
            description VARCHAR NOT NULL,
            requirements VARCHAR,
            location VARCHAR NOT NULL,
            job_type VARCHAR NOT NULL CHECK (job_type IN ('full_time', 'part_time', 'contract', 'internship', 'freelance')),
            sector VARCHAR,
            salary_min BIGINT,
            salary_max BIGINT,
            is_active BOOLEAN DEFAULT 1,
            created_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (company_id) REFERENCES company_profiles (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS applications (
            id VARCHAR PRIMARY KEY,
            job_id VARCHAR NOT NULL,
            candidate_id VARCHAR NOT NULL,
            status VARCHAR DEFAULT 'pending' CHECK (status IN ('pending', 'accepted', 'rejected', 'withdrawn')),
            cover_letter VARCHAR,
            applied_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at VARCHAR NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE (job_id, candidate_id),
            FOREIGN KEY (job_id) REFERENCES jobs (id) ON DELETE CASCADE,
            FOREIGN KEY (candidate_id) REFERENCES candidate_profiles (id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Indexes for the listing queries
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_jobs_active_created
            ON jobs(is_active, created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_jobs_company
            ON jobs(company_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_company_profiles_created
            ON company_profiles(created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_auth_sessions_user
            ON auth_sessions(user_id)",
        [],
    )?;

    Ok(())
}
