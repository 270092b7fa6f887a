// src/db/member_repo.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, sync::SetDiff},
    models::member::{
        assemble_members, Address, Member, MemberAddressRow, MemberRow, MemberStatus,
        Observation, ObservationRow, ResponsibleKind, ResponsibleParty, ResponsibleRow,
        SkillRow,
    },
};

/// Acesso às tabelas de membros e dependentes. Cada escrita lógica
/// (membro + dependentes) é atômica.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Todos os membros, ordenados por nome, já com dependentes.
    async fn list_members(&self) -> Result<Vec<Member>, AppError>;

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, AppError>;

    /// Grava o membro e os dependentes preenchidos; devolve o id gerado pelo banco.
    async fn insert_member(&self, member: &Member) -> Result<Uuid, AppError>;

    async fn update_member(&self, member: &Member) -> Result<(), AppError>;

    /// `false` se não havia linha com esse id.
    async fn delete_member(&self, id: Uuid) -> Result<bool, AppError>;

    async fn set_member_status(&self, id: Uuid, status: MemberStatus) -> Result<bool, AppError>;

    async fn insert_observation(
        &self,
        member_id: Uuid,
        titulo: &str,
        texto: &str,
        data: NaiveDate,
        autor: &str,
    ) -> Result<Observation, AppError>;
}

/// O que fazer com um sub-registro (endereço, responsável) numa atualização.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubRecordWrite {
    Update(Uuid),
    Insert,
    Skip,
}

impl SubRecordWrite {
    /// Atualiza pelo id quando ele é conhecido; senão insere, desde que haja conteúdo.
    pub fn plan(known_id: Option<Uuid>, has_content: bool) -> Self {
        match known_id {
            Some(id) => SubRecordWrite::Update(id),
            None if has_content => SubRecordWrite::Insert,
            None => SubRecordWrite::Skip,
        }
    }
}

const MEMBER_COLUMNS: &str = "id, nome, email, telefone, funcao, status, data_nascimento, \
     data_ingresso, local_nascimento, batizado";

#[derive(Clone)]
pub struct PgMemberRepository {
    pool: PgPool,
}

impl PgMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca os dependentes de todos os membros de uma vez (= ANY) e monta os objetos.
    async fn load_dependents(&self, rows: Vec<MemberRow>) -> Result<Vec<Member>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let addresses = sqlx::query_as::<_, MemberAddressRow>(
            r#"
            SELECT id, member_id, rua, numero, cep, bairro, cidade, estado
            FROM member_addresses
            WHERE member_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let responsibles = sqlx::query_as::<_, ResponsibleRow>(
            r#"
            SELECT id, member_id, tipo, nome, telefone
            FROM member_responsible_parties
            WHERE member_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let skills = sqlx::query_as::<_, SkillRow>(
            r#"
            SELECT id, member_id, habilidade
            FROM member_skills
            WHERE member_id = ANY($1)
            ORDER BY habilidade ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let observations = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT id, member_id, titulo, texto, data, autor
            FROM member_observations
            WHERE member_id = ANY($1)
            ORDER BY data DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_members(rows, addresses, responsibles, skills, observations))
    }
}

// --- Escritas de dependentes (sempre dentro da transação do chamador) ---

async fn insert_address(
    conn: &mut PgConnection,
    member_id: Uuid,
    address: &Address,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO member_addresses (member_id, rua, numero, cep, bairro, cidade, estado)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(member_id)
    .bind(&address.rua)
    .bind(&address.numero)
    .bind(&address.cep)
    .bind(&address.bairro)
    .bind(&address.cidade)
    .bind(&address.estado)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// `false` quando o id não é um endereço deste membro.
async fn update_address(
    conn: &mut PgConnection,
    member_id: Uuid,
    address_id: Uuid,
    address: &Address,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE member_addresses
        SET rua = $3, numero = $4, cep = $5, bairro = $6, cidade = $7, estado = $8
        WHERE id = $1 AND member_id = $2
        "#,
    )
    .bind(address_id)
    .bind(member_id)
    .bind(&address.rua)
    .bind(&address.numero)
    .bind(&address.cep)
    .bind(&address.bairro)
    .bind(&address.cidade)
    .bind(&address.estado)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn insert_responsible(
    conn: &mut PgConnection,
    member_id: Uuid,
    kind: ResponsibleKind,
    party: &ResponsibleParty,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO member_responsible_parties (member_id, tipo, nome, telefone)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(member_id)
    .bind(kind)
    .bind(&party.nome)
    .bind(&party.telefone)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_responsible(
    conn: &mut PgConnection,
    member_id: Uuid,
    kind: ResponsibleKind,
    party_id: Uuid,
    party: &ResponsibleParty,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE member_responsible_parties
        SET nome = $4, telefone = $5
        WHERE id = $1 AND member_id = $2 AND tipo = $3
        "#,
    )
    .bind(party_id)
    .bind(member_id)
    .bind(kind)
    .bind(&party.nome)
    .bind(&party.telefone)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn insert_skills(
    conn: &mut PgConnection,
    member_id: Uuid,
    skills: &[String],
) -> Result<(), AppError> {
    if skills.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO member_skills (member_id, habilidade) SELECT $1, UNNEST($2::text[])",
    )
    .bind(member_id)
    .bind(skills)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl MemberRepository for PgMemberRepository {
    async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members ORDER BY nome ASC",
            MEMBER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        self.load_dependents(rows).await
    }

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, AppError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members WHERE id = $1",
            MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.load_dependents(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_member(&self, member: &Member) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO members (
                nome, email, telefone, funcao, status,
                data_nascimento, data_ingresso, local_nascimento, batizado
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&member.nome)
        .bind(&member.email)
        .bind(&member.telefone)
        .bind(&member.funcao)
        .bind(member.status)
        .bind(member.data_nascimento)
        .bind(member.data_ingresso)
        .bind(&member.local_nascimento)
        .bind(member.batizado)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(address) = member.address_to_write() {
            insert_address(&mut tx, id, address).await?;
        }
        for (kind, party) in member.responsibles_to_write() {
            insert_responsible(&mut tx, id, kind, party).await?;
        }
        insert_skills(&mut tx, id, &member.skills_to_write()).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn update_member(&self, member: &Member) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE members
            SET nome = $2, email = $3, telefone = $4, funcao = $5, status = $6,
                data_nascimento = $7, data_ingresso = $8, local_nascimento = $9,
                batizado = $10, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(member.id)
        .bind(&member.nome)
        .bind(&member.email)
        .bind(&member.telefone)
        .bind(&member.funcao)
        .bind(member.status)
        .bind(member.data_nascimento)
        .bind(member.data_ingresso)
        .bind(&member.local_nascimento)
        .bind(member.batizado)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::MemberNotFound);
        }

        // Sub-registros: o id do cliente só vale se for deste membro; senão
        // procuramos a linha existente para não duplicar.
        if let Some(address) = &member.endereco {
            let updated = match address.id {
                Some(id) => update_address(&mut tx, member.id, id, address).await?,
                None => false,
            };
            if !updated {
                let existing = sqlx::query_scalar::<_, Uuid>(
                    "SELECT id FROM member_addresses WHERE member_id = $1 LIMIT 1",
                )
                .bind(member.id)
                .fetch_optional(&mut *tx)
                .await?;
                match SubRecordWrite::plan(existing, address.has_content()) {
                    SubRecordWrite::Update(id) => {
                        update_address(&mut tx, member.id, id, address).await?;
                    }
                    SubRecordWrite::Insert => insert_address(&mut tx, member.id, address).await?,
                    SubRecordWrite::Skip => {}
                }
            }
        }

        if let Some(responsibles) = &member.responsaveis {
            for kind in [ResponsibleKind::Pai, ResponsibleKind::Mae] {
                let Some(party) = responsibles.get(kind) else {
                    continue;
                };
                let updated = match party.id {
                    Some(id) => update_responsible(&mut tx, member.id, kind, id, party).await?,
                    None => false,
                };
                if updated {
                    continue;
                }
                let existing = sqlx::query_scalar::<_, Uuid>(
                    "SELECT id FROM member_responsible_parties WHERE member_id = $1 AND tipo = $2 LIMIT 1",
                )
                .bind(member.id)
                .bind(kind)
                .fetch_optional(&mut *tx)
                .await?;
                match SubRecordWrite::plan(existing, party.has_content()) {
                    SubRecordWrite::Update(id) => {
                        update_responsible(&mut tx, member.id, kind, id, party).await?;
                    }
                    SubRecordWrite::Insert => {
                        insert_responsible(&mut tx, member.id, kind, party).await?
                    }
                    SubRecordWrite::Skip => {}
                }
            }
        }

        // Habilidades: só o que mudou
        let current: Vec<String> = sqlx::query_scalar(
            "SELECT habilidade FROM member_skills WHERE member_id = $1",
        )
        .bind(member.id)
        .fetch_all(&mut *tx)
        .await?;
        let diff = SetDiff::between(&current, &member.skills_to_write());

        if !diff.removed.is_empty() {
            sqlx::query("DELETE FROM member_skills WHERE member_id = $1 AND habilidade = ANY($2)")
                .bind(member.id)
                .bind(&diff.removed)
                .execute(&mut *tx)
                .await?;
        }
        insert_skills(&mut tx, member.id, &diff.added).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_member(&self, id: Uuid) -> Result<bool, AppError> {
        // Os dependentes caem por ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_member_status(&self, id: Uuid, status: MemberStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE members SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_observation(
        &self,
        member_id: Uuid,
        titulo: &str,
        texto: &str,
        data: NaiveDate,
        autor: &str,
    ) -> Result<Observation, AppError> {
        let row = sqlx::query_as::<_, ObservationRow>(
            r#"
            INSERT INTO member_observations (member_id, titulo, texto, data, autor)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, member_id, titulo, texto, data, autor
            "#,
        )
        .bind(member_id)
        .bind(titulo)
        .bind(texto)
        .bind(data)
        .bind(autor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::MemberNotFound;
                }
            }
            e.into()
        })?;

        Ok(row.into())
    }
}
