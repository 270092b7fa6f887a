// src/db/small_group_repo.rs

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        sync::{dedup_preserving_order, SetDiff},
    },
    models::small_group::{
        assemble_small_groups, AttendanceRecord, AttendanceRow, GroupMemberRow, NewAttendance,
        NewSmallGroup, SmallGroup, SmallGroupRow, Visitor,
    },
};

/// Acesso a grupos, ao vínculo grupo <-> membro e às chamadas.
#[async_trait]
pub trait SmallGroupRepository: Send + Sync {
    async fn list_small_groups(&self) -> Result<Vec<SmallGroup>, AppError>;

    async fn find_small_group(&self, id: Uuid) -> Result<Option<SmallGroup>, AppError>;

    /// Grupo + vínculos iniciais; devolve o grupo com o id gerado pelo banco.
    async fn insert_small_group(&self, group: &NewSmallGroup) -> Result<SmallGroup, AppError>;

    /// Atualiza a linha do grupo e sincroniza `membros` com a tabela de vínculo.
    async fn update_small_group(&self, group: &SmallGroup) -> Result<(), AppError>;

    async fn delete_small_group(&self, id: Uuid) -> Result<bool, AppError>;

    async fn membership_exists(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError>;

    /// `false` quando o vínculo já existia.
    async fn insert_membership(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError>;

    async fn delete_membership(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError>;

    async fn insert_attendance(
        &self,
        group_id: Uuid,
        attendance: &NewAttendance,
    ) -> Result<AttendanceRecord, AppError>;
}

const GROUP_COLUMNS: &str = "id, nome, descricao, endereco, responsavel_nome, \
     responsavel_telefone, responsavel_email, frequencia, dia_semana, horario";

#[derive(Clone)]
pub struct PgSmallGroupRepository {
    pool: PgPool,
}

impl PgSmallGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_memberships(
    conn: &mut PgConnection,
    group_id: Uuid,
    member_ids: &[Uuid],
) -> Result<(), AppError> {
    if member_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO small_group_members (grupo_id, membro_id)
        SELECT $1, UNNEST($2::uuid[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(group_id)
    .bind(member_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn map_fk_violation(e: sqlx::Error, not_found: AppError) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return not_found;
        }
    }
    e.into()
}

// O vínculo tem duas chaves estrangeiras; o nome da constraint diz qual falhou.
fn map_membership_fk_violation(e: sqlx::Error) -> AppError {
    let constraint = match &e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            db_err.constraint().map(str::to_string)
        }
        _ => return e.into(),
    };
    missing_side_of_membership(constraint.as_deref())
}

fn missing_side_of_membership(constraint: Option<&str>) -> AppError {
    match constraint {
        Some(name) if name.contains("membro_id") => AppError::MemberNotFound,
        _ => AppError::SmallGroupNotFound,
    }
}

#[async_trait]
impl SmallGroupRepository for PgSmallGroupRepository {
    async fn list_small_groups(&self) -> Result<Vec<SmallGroup>, AppError> {
        // Três consultas independentes, montadas em memória
        let rows = sqlx::query_as::<_, SmallGroupRow>(&format!(
            "SELECT {} FROM small_groups ORDER BY nome ASC",
            GROUP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let joins = sqlx::query_as::<_, GroupMemberRow>(
            "SELECT grupo_id, membro_id FROM small_group_members ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let attendance = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, grupo_id, data_encontro, membros_presentes, visitantes
            FROM small_group_attendance
            ORDER BY data_encontro ASC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_small_groups(rows, joins, attendance))
    }

    async fn find_small_group(&self, id: Uuid) -> Result<Option<SmallGroup>, AppError> {
        let Some(row) = sqlx::query_as::<_, SmallGroupRow>(&format!(
            "SELECT {} FROM small_groups WHERE id = $1",
            GROUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let members: Vec<Uuid> = sqlx::query_scalar(
            "SELECT membro_id FROM small_group_members WHERE grupo_id = $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let attendance = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, grupo_id, data_encontro, membros_presentes, visitantes
            FROM small_group_attendance
            WHERE grupo_id = $1
            ORDER BY data_encontro ASC, created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SmallGroup::assemble(
            row,
            dedup_preserving_order(&members),
            attendance,
        )))
    }

    async fn insert_small_group(&self, group: &NewSmallGroup) -> Result<SmallGroup, AppError> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO small_groups (
                nome, descricao, endereco,
                responsavel_nome, responsavel_telefone, responsavel_email,
                frequencia, dia_semana, horario
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&group.nome)
        .bind(&group.descricao)
        .bind(group.endereco.to_json())
        .bind(&group.responsavel.nome)
        .bind(&group.responsavel.telefone)
        .bind(&group.responsavel.email)
        .bind(group.frequencia)
        .bind(group.dia_semana)
        .bind(&group.horario)
        .fetch_one(&mut *tx)
        .await?;

        let members = dedup_preserving_order(&group.membros);
        insert_memberships(&mut tx, id, &members)
            .await
            .map_err(|e| match e {
                AppError::DatabaseError(db) => map_fk_violation(db, AppError::MemberNotFound),
                other => other,
            })?;

        tx.commit().await?;

        let mut created = group.clone().into_group(id);
        created.membros = members;
        Ok(created)
    }

    async fn update_small_group(&self, group: &SmallGroup) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE small_groups
            SET nome = $2, descricao = $3, endereco = $4,
                responsavel_nome = $5, responsavel_telefone = $6, responsavel_email = $7,
                frequencia = $8, dia_semana = $9, horario = $10, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(group.id)
        .bind(&group.nome)
        .bind(&group.descricao)
        .bind(group.endereco.to_json())
        .bind(&group.responsavel.nome)
        .bind(&group.responsavel.telefone)
        .bind(&group.responsavel.email)
        .bind(group.frequencia)
        .bind(group.dia_semana)
        .bind(&group.horario)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::SmallGroupNotFound);
        }

        let current: Vec<Uuid> =
            sqlx::query_scalar("SELECT membro_id FROM small_group_members WHERE grupo_id = $1")
                .bind(group.id)
                .fetch_all(&mut *tx)
                .await?;
        let diff = SetDiff::between(&current, &group.membros);
        if diff.is_empty() {
            tx.commit().await?;
            return Ok(());
        }

        if !diff.removed.is_empty() {
            sqlx::query(
                "DELETE FROM small_group_members WHERE grupo_id = $1 AND membro_id = ANY($2)",
            )
            .bind(group.id)
            .bind(&diff.removed)
            .execute(&mut *tx)
            .await?;
        }
        insert_memberships(&mut tx, group.id, &diff.added)
            .await
            .map_err(|e| match e {
                AppError::DatabaseError(db) => map_fk_violation(db, AppError::MemberNotFound),
                other => other,
            })?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_small_group(&self, id: Uuid) -> Result<bool, AppError> {
        // Vínculos e chamadas caem por ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM small_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn membership_exists(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM small_group_members
                WHERE grupo_id = $1 AND membro_id = $2
            )
            "#,
        )
        .bind(group_id)
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_membership(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO small_group_members (grupo_id, membro_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(member_id)
        .execute(&self.pool)
        .await
        .map_err(map_membership_fk_violation)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_membership(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM small_group_members WHERE grupo_id = $1 AND membro_id = $2")
                .bind(group_id)
                .bind(member_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_attendance(
        &self,
        group_id: Uuid,
        attendance: &NewAttendance,
    ) -> Result<AttendanceRecord, AppError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            INSERT INTO small_group_attendance (grupo_id, data_encontro, membros_presentes, visitantes)
            VALUES ($1, $2, $3, $4)
            RETURNING id, grupo_id, data_encontro, membros_presentes, visitantes
            "#,
        )
        .bind(group_id)
        .bind(attendance.data)
        .bind(&attendance.membros_presentes)
        .bind(Visitor::list_to_json(&attendance.visitantes))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_fk_violation(e, AppError::SmallGroupNotFound))?;

        Ok(row.into())
    }
}
