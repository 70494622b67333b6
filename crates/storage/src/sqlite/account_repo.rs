use mathwrks_core::model::{Student, StudentId, Teacher, TeacherId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, map_student_row, map_teacher_row, ser};
use crate::repository::{
    NewStudent, NewTeacher, StorageError, StudentCredentials, StudentRepository, StudentStats,
    TeacherCredentials, TeacherRepository,
};

#[async_trait::async_trait]
impl StudentRepository for SqliteRepository {
    async fn insert_student(&self, student: NewStudent) -> Result<Student, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO students (username, password_hash, name, total_points, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(&student.username)
        .bind(&student.password_hash)
        .bind(&student.name)
        .bind(student.total_points)
        .bind(student.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Student {
            id: StudentId::new(res.last_insert_rowid()),
            username: student.username,
            name: student.name,
            total_points: student.total_points,
            created_at: student.created_at,
        })
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, name, total_points, created_at
            FROM students WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_student_row).transpose()
    }

    async fn find_student_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StudentCredentials>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, password_hash, name, total_points, created_at
            FROM students WHERE username = ?1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(StudentCredentials {
                student: map_student_row(&row)?,
                password_hash: row.try_get("password_hash").map_err(ser)?,
            })),
            None => Ok(None),
        }
    }

    async fn list_student_stats(&self) -> Result<Vec<StudentStats>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT s.id, s.username, s.name, s.total_points, s.created_at,
                   COUNT(qs.id) AS total_quizzes,
                   COALESCE(SUM(qs.correct_answers), 0) AS total_correct,
                   COALESCE(SUM(qs.total_questions), 0) AS total_answered
            FROM students s
            LEFT JOIN quiz_sessions qs ON qs.student_id = s.id
            GROUP BY s.id
            ORDER BY s.name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let quizzes: i64 = row.try_get("total_quizzes").map_err(ser)?;
            out.push(StudentStats {
                student: map_student_row(&row)?,
                total_quizzes: u32::try_from(quizzes).map_err(ser)?,
                total_correct: row.try_get("total_correct").map_err(ser)?,
                total_answered: row.try_get("total_answered").map_err(ser)?,
            });
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl TeacherRepository for SqliteRepository {
    async fn insert_teacher(&self, teacher: NewTeacher) -> Result<Teacher, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO teachers (username, password_hash, created_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(&teacher.username)
        .bind(&teacher.password_hash)
        .bind(teacher.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Teacher {
            id: TeacherId::new(res.last_insert_rowid()),
            username: teacher.username,
            created_at: teacher.created_at,
        })
    }

    async fn find_teacher_by_username(
        &self,
        username: &str,
    ) -> Result<Option<TeacherCredentials>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, password_hash, created_at
            FROM teachers WHERE username = ?1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(TeacherCredentials {
                teacher: map_teacher_row(&row)?,
                password_hash: row.try_get("password_hash").map_err(ser)?,
            })),
            None => Ok(None),
        }
    }
}
