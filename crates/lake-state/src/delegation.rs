macro_rules! impl_store_delegates {
    ($db_ty:ty, $run_migrations:path) => {
        #[async_trait::async_trait]
        impl lake_core::database::CatalogRepository for $db_ty {
            async fn create_workspace(
                &self,
                name: &str,
                description: Option<&str>,
            ) -> anyhow::Result<lake_core::models::Workspace> {
                <$db_ty>::create_workspace_impl(self, name, description).await
            }

            async fn create_connection(
                &self,
                connection: &lake_core::database::NewConnection,
            ) -> anyhow::Result<lake_core::models::Connection> {
                <$db_ty>::create_connection_impl(self, connection).await
            }

            async fn create_job(
                &self,
                job: &lake_core::database::NewJob,
            ) -> anyhow::Result<lake_core::models::Job> {
                <$db_ty>::create_job_impl(self, job).await
            }

            async fn load_job(
                &self,
                job_id: uuid::Uuid,
            ) -> anyhow::Result<Option<lake_core::models::Job>> {
                <$db_ty>::load_job_impl(self, job_id).await
            }

            async fn load_connection(
                &self,
                connection_id: uuid::Uuid,
            ) -> anyhow::Result<Option<lake_core::models::Connection>> {
                <$db_ty>::load_connection_impl(self, connection_id).await
            }
        }

        #[async_trait::async_trait]
        impl lake_core::database::RunRepository for $db_ty {
            async fn create_run(
                &self,
                job_id: uuid::Uuid,
                parameters: Option<serde_json::Value>,
            ) -> anyhow::Result<lake_core::models::Run> {
                <$db_ty>::create_run_impl(self, job_id, parameters).await
            }

            async fn get_run(
                &self,
                run_id: uuid::Uuid,
            ) -> anyhow::Result<Option<lake_core::models::Run>> {
                <$db_ty>::get_run_impl(self, run_id).await
            }

            async fn list_runs(
                &self,
                status: Option<lake_core::models::RunStatus>,
            ) -> anyhow::Result<Vec<lake_core::models::Run>> {
                <$db_ty>::list_runs_impl(self, status).await
            }

            async fn find_eligible(
                &self,
                limit: i64,
            ) -> anyhow::Result<Vec<lake_core::models::Run>> {
                <$db_ty>::find_eligible_impl(self, limit).await
            }

            async fn compare_and_set_status(
                &self,
                run_id: uuid::Uuid,
                expected: lake_core::models::RunStatus,
                transition: &lake_core::models::RunTransition,
            ) -> anyhow::Result<bool> {
                <$db_ty>::compare_and_set_status_impl(self, run_id, expected, transition).await
            }
        }

        #[async_trait::async_trait]
        impl lake_core::database::RunStore for $db_ty {
            async fn run_migrations(&self) -> anyhow::Result<()> {
                $run_migrations(self).await
            }
        }
    };
}

pub(crate) use impl_store_delegates;
