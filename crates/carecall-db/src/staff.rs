//! Departments, teams, admins, staff assignment and named sequences.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use carecall_core::error::{CareError, Result};
use carecall_core::staff::{Department, Requester, Team, TeamLookup};
use carecall_core::traits::{SequenceCounter, StaffDirectory};

use crate::CareDb;

fn load_members(conn: &Connection, team_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT staff_id FROM team_members WHERE team_id = ?1 ORDER BY staff_id")
        .map_err(|e| CareError::storage(format!("Load members: {e}")))?;
    stmt.query_map([team_id], |r| r.get(0))
        .map_err(|e| CareError::storage(format!("Load members: {e}")))?
        .collect::<rusqlite::Result<Vec<i64>>>()
        .map_err(|e| CareError::storage(format!("Load members: {e}")))
}

impl CareDb {
    pub fn upsert_department(&self, department: &Department) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO departments (id, code, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET code = excluded.code, name = excluded.name",
                params![department.id, department.code, department.name],
            )
            .map_err(|e| CareError::storage(format!("Save department: {e}")))?;
        Ok(())
    }

    /// Insert or replace a team and its member list.
    pub fn upsert_team(&self, team: &Team) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| CareError::storage(format!("Begin: {e}")))?;
        tx.execute(
            "INSERT INTO teams (id, department_id, name, leader_id) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET department_id = excluded.department_id,
                 name = excluded.name, leader_id = excluded.leader_id",
            params![team.id, team.department_id, team.name, team.leader_id],
        )
        .map_err(|e| CareError::storage(format!("Save team: {e}")))?;
        tx.execute("DELETE FROM team_members WHERE team_id = ?1", [team.id])
            .map_err(|e| CareError::storage(format!("Save team: {e}")))?;
        for member in &team.member_ids {
            tx.execute(
                "INSERT OR IGNORE INTO team_members (team_id, staff_id) VALUES (?1, ?2)",
                params![team.id, member],
            )
            .map_err(|e| CareError::storage(format!("Save team member: {e}")))?;
        }
        tx.commit()
            .map_err(|e| CareError::storage(format!("Commit: {e}")))?;
        Ok(())
    }

    pub fn upsert_admin(&self, name: &str, requester: &Requester) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO admins (id, name, department_id, role) VALUES (?1, ?2, ?3, ?4)",
                params![requester.id, name, requester.department_id, requester.role.as_str()],
            )
            .map_err(|e| CareError::storage(format!("Save admin: {e}")))?;
        Ok(())
    }

    /// Point a student at a care staff member (or clear the assignment).
    pub fn assign_staff(&self, student_id: i64, staff_id: Option<i64>) -> Result<()> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE students SET staff_id = ?1 WHERE id = ?2",
                params![staff_id, student_id],
            )
            .map_err(|e| CareError::storage(format!("Assign staff: {e}")))?;
        if changed == 0 {
            return Err(CareError::NotFound(format!("student {student_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl StaffDirectory for CareDb {
    async fn assigned_staff(&self, student_id: i64) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let staff: Option<Option<i64>> = conn
            .query_row("SELECT staff_id FROM students WHERE id = ?1", [student_id], |r| r.get(0))
            .optional()
            .map_err(|e| CareError::storage(format!("Load assignment: {e}")))?;
        Ok(staff.flatten())
    }

    async fn find_department_by_code(&self, code: &str) -> Result<Option<Department>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, code, name FROM departments WHERE code = ?1",
            [code],
            |row| {
                Ok(Department {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| CareError::storage(format!("Load department: {e}")))
    }

    async fn find_team(&self, lookup: TeamLookup) -> Result<Option<Team>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT t.id, t.department_id, t.name, t.leader_id
                 FROM teams t
                 LEFT JOIN team_members m ON m.team_id = t.id
                 WHERE t.department_id = ?1 AND (t.leader_id = ?2 OR m.staff_id = ?3)
                 ORDER BY (t.leader_id = ?2) DESC, t.id
                 LIMIT 1",
            )
            .map_err(|e| CareError::storage(format!("Find team: {e}")))?;
        let head = stmt
            .query_row(
                params![lookup.department_id, lookup.leader_id, lookup.member_id],
                |row| {
                    Ok(Team {
                        id: row.get(0)?,
                        department_id: row.get(1)?,
                        name: row.get(2)?,
                        leader_id: row.get(3)?,
                        member_ids: Vec::new(),
                    })
                },
            )
            .optional()
            .map_err(|e| CareError::storage(format!("Find team: {e}")))?;
        match head {
            Some(mut team) => {
                team.member_ids = load_members(&conn, team.id)?;
                Ok(Some(team))
            }
            None => Ok(None),
        }
    }

    async fn requester(&self, admin_id: i64) -> Result<Option<Requester>> {
        let conn = self.conn()?;
        let row: Option<(i64, i64, String)> = conn
            .query_row(
                "SELECT id, department_id, role FROM admins WHERE id = ?1",
                [admin_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()
            .map_err(|e| CareError::storage(format!("Load admin: {e}")))?;
        row.map(|(id, department_id, role)| -> Result<Requester> {
            Ok(Requester {
                id,
                department_id,
                role: role.parse()?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl SequenceCounter for CareDb {
    async fn next_id(&self, sequence: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row(
            "INSERT INTO sequences (name, value) VALUES (?1, 1)
             ON CONFLICT(name) DO UPDATE SET value = value + 1
             RETURNING value",
            [sequence],
            |r| r.get(0),
        )
        .map_err(|e| CareError::storage(format!("Next id: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecall_core::staff::Role;

    fn seed(db: &CareDb) {
        db.upsert_department(&Department {
            id: 1,
            code: "CARE".into(),
            name: "Customer care".into(),
        })
        .unwrap();
        db.upsert_team(&Team {
            id: 5,
            department_id: 1,
            name: "North".into(),
            leader_id: 100,
            member_ids: vec![101, 102],
        })
        .unwrap();
    }

    #[tokio::test]
    async fn test_find_team_by_leader_and_member() {
        let db = CareDb::open_in_memory().unwrap();
        seed(&db);

        let by_leader = db.find_team(TeamLookup::containing(1, 100)).await.unwrap().unwrap();
        assert_eq!(by_leader.id, 5);
        assert_eq!(by_leader.member_ids, vec![101, 102]);

        let by_member = db.find_team(TeamLookup::containing(1, 102)).await.unwrap().unwrap();
        assert_eq!(by_member.leader_id, 100);

        assert!(db.find_team(TeamLookup::containing(1, 103)).await.unwrap().is_none());
        assert!(db.find_team(TeamLookup::containing(2, 100)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_department_lookup() {
        let db = CareDb::open_in_memory().unwrap();
        seed(&db);
        assert_eq!(db.find_department_by_code("CARE").await.unwrap().unwrap().id, 1);
        assert!(db.find_department_by_code("ACADEMIC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requester_lookup() {
        let db = CareDb::open_in_memory().unwrap();
        let requester = Requester {
            id: 100,
            department_id: 1,
            role: Role::Leader,
        };
        db.upsert_admin("Hoa", &requester).unwrap();
        assert_eq!(db.requester(100).await.unwrap(), Some(requester));
        assert_eq!(db.requester(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let db = CareDb::open_in_memory().unwrap();
        assert_eq!(db.next_id("care_task").await.unwrap(), 1);
        assert_eq!(db.next_id("care_task").await.unwrap(), 2);
        assert_eq!(db.next_id("other").await.unwrap(), 1);
    }

    #[test]
    fn test_assign_unknown_student() {
        let db = CareDb::open_in_memory().unwrap();
        assert!(matches!(db.assign_staff(1, Some(2)), Err(CareError::NotFound(_))));
    }
}
