pub mod mock_store;
